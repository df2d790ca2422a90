//! The user store interface and its key-value implementation.
//!
//! # Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `users/{id}` | JSON [`UserRecord`] |
//! | `user-emails/{normalized email}` | decimal user id |
//! | `users/next-id` | decimal counter, advanced by compare-and-set |

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
    types::UserId,
    users::record::{NewUser, UserRecord, normalize_email},
};

/// Key prefix for user records.
pub const USER_PREFIX: &str = "users/";

/// Key prefix for the email uniqueness index.
pub const EMAIL_INDEX_PREFIX: &str = "user-emails/";

const NEXT_ID_KEY: &[u8] = b"users/next-id";

/// Persistence for user accounts.
///
/// Credential verification and token handling are not the store's concern;
/// it only keeps records and enforces email uniqueness.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates an account and assigns it an id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the email is already registered,
    /// compared case-insensitively.
    async fn create_user(&self, new_user: NewUser) -> StorageResult<UserRecord>;

    /// Fetches an account by id.
    async fn get_user(&self, id: UserId) -> StorageResult<Option<UserRecord>>;

    /// Fetches an account by email, compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Replaces an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no account has `user.id`, or
    /// [`StorageError::Conflict`] if the email changes to one already taken.
    async fn update_user(&self, user: &UserRecord) -> StorageResult<()>;
}

/// [`UserStore`] over any [`StorageBackend`].
#[derive(Clone)]
pub struct BackendUserStore<B> {
    backend: B,
}

/// User store kept entirely in process memory.
pub type MemoryUserStore = BackendUserStore<MemoryBackend>;

impl<B: StorageBackend> BackendUserStore<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn user_key(id: UserId) -> Vec<u8> {
        format!("{USER_PREFIX}{id}").into_bytes()
    }

    fn email_key(email: &str) -> Vec<u8> {
        format!("{EMAIL_INDEX_PREFIX}{}", normalize_email(email)).into_bytes()
    }

    async fn allocate_id(&self) -> StorageResult<UserId> {
        loop {
            let current = self.backend.get(NEXT_ID_KEY).await?;
            let next = match &current {
                Some(bytes) => parse_id(bytes)?.0 + 1,
                None => 1,
            };
            match self
                .backend
                .compare_and_set(NEXT_ID_KEY, current.as_deref(), next.to_string().into_bytes())
                .await
            {
                Ok(()) => return Ok(UserId(next)),
                Err(StorageError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    async fn write_record(&self, user: &UserRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec(user)?;
        self.backend.set(Self::user_key(user.id), bytes).await
    }
}

fn parse_id(bytes: &[u8]) -> StorageResult<UserId> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or_else(|| StorageError::serialization("stored user id is not a decimal integer"))
}

#[async_trait]
impl<B: StorageBackend> UserStore for BackendUserStore<B> {
    #[tracing::instrument(skip(self, new_user))]
    async fn create_user(&self, new_user: NewUser) -> StorageResult<UserRecord> {
        let email_key = Self::email_key(&new_user.email);

        // Cheap early exit; the compare-and-set below is what guarantees uniqueness.
        if self.backend.get(&email_key).await?.is_some() {
            return Err(StorageError::conflict());
        }

        let id = self.allocate_id().await?;
        self.backend.compare_and_set(&email_key, None, id.to_string().into_bytes()).await?;

        let now = Utc::now();
        let record = UserRecord {
            id,
            name: new_user.name,
            email: new_user.email.trim().to_owned(),
            password_hash: new_user.password_hash,
            active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.write_record(&record).await {
            // Release the reservation so the email can be registered again.
            let _rollback = self.backend.delete(&email_key).await;
            return Err(e);
        }

        tracing::debug!(user.id = %id, "user created");
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        match self.backend.get(&Self::user_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all)]
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let Some(bytes) = self.backend.get(&Self::email_key(email)).await? else {
            return Ok(None);
        };
        // An index entry without a record means creation has not finished.
        self.get_user(parse_id(&bytes)?).await
    }

    #[tracing::instrument(skip(self, user), fields(user.id = %user.id))]
    async fn update_user(&self, user: &UserRecord) -> StorageResult<()> {
        let existing = self
            .get_user(user.id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("{USER_PREFIX}{}", user.id)))?;

        let old_email_key = Self::email_key(&existing.email);
        let new_email_key = Self::email_key(&user.email);
        if old_email_key != new_email_key {
            self.backend
                .compare_and_set(&new_email_key, None, user.id.to_string().into_bytes())
                .await?;
        }

        self.write_record(user).await?;

        if old_email_key != new_email_key {
            self.backend.delete(&old_email_key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser::builder()
            .name("Test User")
            .email(email)
            .password_hash(String::from("$argon2id$hash"))
            .build()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = MemoryUserStore::new(MemoryBackend::new());

        let first = store.create_user(new_user("a@example.com")).await.unwrap();
        let second = store.create_user(new_user("b@example.com")).await.unwrap();

        assert_eq!(first.id, UserId(1));
        assert_eq!(second.id, UserId(2));
        assert!(first.active);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_case_insensitively() {
        let store = MemoryUserStore::new(MemoryBackend::new());
        store.create_user(new_user("ada@example.com")).await.unwrap();

        let result = store.create_user(new_user("ADA@Example.com")).await;
        assert!(matches!(result, Err(StorageError::Conflict)));
    }

    #[tokio::test]
    async fn test_find_by_email_round_trips() {
        let store = MemoryUserStore::new(MemoryBackend::new());
        let created = store.create_user(new_user("ada@example.com")).await.unwrap();

        let found = store.find_by_email(" Ada@example.com").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_changes_profile() {
        let store = MemoryUserStore::new(MemoryBackend::new());
        let mut user = store.create_user(new_user("ada@example.com")).await.unwrap();

        user.name = "Ada Lovelace".into();
        user.active = false;
        store.update_user(&user).await.unwrap();

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ada Lovelace");
        assert!(!stored.active);
    }

    #[tokio::test]
    async fn test_update_user_moves_email_index() {
        let store = MemoryUserStore::new(MemoryBackend::new());
        let mut user = store.create_user(new_user("old@example.com")).await.unwrap();

        user.email = "new@example.com".into();
        store.update_user(&user).await.unwrap();

        assert!(store.find_by_email("old@example.com").await.unwrap().is_none());
        assert_eq!(store.find_by_email("new@example.com").await.unwrap().unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = MemoryUserStore::new(MemoryBackend::new());
        let ghost = UserRecord::builder()
            .id(99)
            .name("Ghost")
            .email("ghost@example.com")
            .password_hash(String::from("x"))
            .build();

        let result = store.update_user(&ghost).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_counter_surfaces_serialization_error() {
        let backend = MemoryBackend::new();
        backend.set(NEXT_ID_KEY.to_vec(), b"not-a-number".to_vec()).await.unwrap();
        let store = MemoryUserStore::new(backend);

        let result = store.create_user(new_user("a@example.com")).await;
        assert!(matches!(result, Err(StorageError::Serialization { .. })));
    }
}
