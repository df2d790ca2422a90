//! User account records and their public projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::types::UserId;

/// A stored user account.
///
/// The password is held only as a PHC-format hash string and is wrapped in
/// [`Zeroizing`] so it is scrubbed when the record is dropped. It is never
/// part of [`UserProfile`] and is redacted from `Debug` output.
///
/// # Example
///
/// ```
/// use tokengate_storage::users::UserRecord;
///
/// let user = UserRecord::builder()
///     .id(1)
///     .name("Ada")
///     .email("ada@example.com")
///     .password_hash(String::from("$argon2id$v=19$..."))
///     .build();
///
/// assert!(user.active);
/// assert_eq!(user.profile().email, "ada@example.com");
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    /// Store-assigned identifier.
    #[builder(into)]
    pub id: UserId,

    /// Display name.
    #[builder(into)]
    pub name: String,

    /// Email address as registered. Lookups compare it case-insensitively.
    #[builder(into)]
    pub email: String,

    /// Argon2 PHC hash of the password. Takes an owned `String` or an
    /// already wrapped value.
    #[builder(into)]
    pub password_hash: Zeroizing<String>,

    /// Inactive accounts cannot log in and their tokens stop resolving to a
    /// profile.
    #[builder(default = true)]
    pub active: bool,

    /// When the account was created.
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    /// When the account was last modified.
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Public view of this account, without credential material.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// The public profile returned to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for [`UserStore::create_user`](super::UserStore::create_user).
#[derive(Clone, bon::Builder)]
pub struct NewUser {
    /// Display name.
    #[builder(into)]
    pub name: String,
    /// Email address.
    #[builder(into)]
    pub email: String,
    /// Argon2 PHC hash of the password, already computed by the caller.
    #[builder(into)]
    pub password_hash: Zeroizing<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Canonical form of an email address for uniqueness and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> UserRecord {
        UserRecord::builder()
            .id(3)
            .name("Grace")
            .email("grace@example.com")
            .password_hash(String::from("$argon2id$secret-material"))
            .build()
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret-material"));
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let json = serde_json::to_value(sample().profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Grace");
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["role"] = serde_json::json!("admin");
        assert!(serde_json::from_value::<UserRecord>(json).is_err());
    }

    #[test]
    fn test_builders_take_owned_or_wrapped_hash() {
        let owned = sample();
        let wrapped = UserRecord::builder()
            .id(3)
            .name("Grace")
            .email("grace@example.com")
            .password_hash(Zeroizing::new("$argon2id$secret-material".to_owned()))
            .created_at(owned.created_at)
            .updated_at(owned.updated_at)
            .build();
        assert_eq!(owned, wrapped);

        let new_user = NewUser::builder()
            .name("Grace")
            .email("grace@example.com")
            .password_hash("$argon2id$fresh".to_owned())
            .build();
        assert_eq!(new_user.password_hash.as_str(), "$argon2id$fresh");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
