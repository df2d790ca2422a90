//! Shared test utilities for code built on the storage layer.
//!
//! Feature-gated behind `testutil`. Enable it from `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! tokengate-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    StorageBackend,
    error::{StorageError, StorageResult},
    types::UserId,
    users::{NewUser, UserRecord, UserStore},
};

/// A backend whose every operation fails with [`StorageError::Connection`].
///
/// Stands in for an unreachable store when testing fail-closed paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableBackend;

fn unreachable_store() -> StorageError {
    StorageError::connection("storage backend unreachable")
}

#[async_trait]
impl StorageBackend for UnavailableBackend {
    async fn get(&self, _key: &[u8]) -> StorageResult<Option<Bytes>> {
        Err(unreachable_store())
    }

    async fn set(&self, _key: Vec<u8>, _value: Vec<u8>) -> StorageResult<()> {
        Err(unreachable_store())
    }

    async fn set_with_ttl(
        &self,
        _key: Vec<u8>,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> StorageResult<()> {
        Err(unreachable_store())
    }

    async fn insert_with_ttl(
        &self,
        _key: Vec<u8>,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> StorageResult<bool> {
        Err(unreachable_store())
    }

    async fn compare_and_set(
        &self,
        _key: &[u8],
        _expected: Option<&[u8]>,
        _new_value: Vec<u8>,
    ) -> StorageResult<()> {
        Err(unreachable_store())
    }

    async fn delete(&self, _key: &[u8]) -> StorageResult<()> {
        Err(unreachable_store())
    }

    async fn purge_expired(&self) -> StorageResult<u64> {
        Err(unreachable_store())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Err(unreachable_store())
    }
}

/// A user store whose every operation fails with [`StorageError::Connection`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableUserStore;

#[async_trait]
impl UserStore for UnavailableUserStore {
    async fn create_user(&self, _new_user: NewUser) -> StorageResult<UserRecord> {
        Err(unreachable_store())
    }

    async fn get_user(&self, _id: UserId) -> StorageResult<Option<UserRecord>> {
        Err(unreachable_store())
    }

    async fn find_by_email(&self, _email: &str) -> StorageResult<Option<UserRecord>> {
        Err(unreachable_store())
    }

    async fn update_user(&self, _user: &UserRecord) -> StorageResult<()> {
        Err(unreachable_store())
    }
}

/// Builds an active [`UserRecord`] with the given id and email and a
/// placeholder hash.
#[must_use]
pub fn user_record(id: i64, email: &str) -> UserRecord {
    UserRecord::builder()
        .id(id)
        .name(format!("user-{id}"))
        .email(email)
        .password_hash(String::from("$argon2id$v=19$m=19456,t=2,p=1$placeholder$placeholder"))
        .build()
}

/// Asserts that a [`StorageResult`] is a [`StorageError::Conflict`].
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {{
        let result = &$result;
        assert!(
            matches!(result, Err($crate::StorageError::Conflict)),
            "expected StorageError::Conflict, got: {:?}",
            result,
        );
    }};
}
