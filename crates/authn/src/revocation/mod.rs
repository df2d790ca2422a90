//! Revocation store: the record of tokens invalidated before their natural
//! expiry.
//!
//! The server never persists valid tokens, only revoked ones. Each entry
//! lives exactly as long as the token it shadows; once the token's own expiry
//! has passed the codec rejects it regardless, so the entry is dead weight and
//! may be purged.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryRevocationStore`]: a moka cache with per-entry expiry
//! - [`StorageRevocationStore`]: entries written through any
//!   [`StorageBackend`](tokengate_storage::StorageBackend) with a TTL
//!
//! [`RevocationSweeper`] periodically calls
//! [`purge_expired`](RevocationStore::purge_expired) on either.

mod memory;
mod storage;
mod sweeper;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryRevocationStore;
pub use storage::{REVOCATION_PREFIX, StorageRevocationStore};
pub use sweeper::RevocationSweeper;

use crate::error::Result;

/// Records and answers revocations.
///
/// # Consistency
///
/// Once `revoke` returns `Ok`, every later `is_revoked` call for the same
/// token string, from any task, returns `true` until the token expires.
///
/// Entry retention is derived from the wall clock at revocation time but
/// enforced with a monotonic deadline. If the wall clock is stepped backwards
/// after a revocation, the entry can lapse while the codec, which reads the
/// wall clock, still accepts the token. Hosts must keep the clock
/// monotonic (slewing NTP) for the guarantee to hold.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revokes `token`, whose own expiry is `expires_at` (seconds since
    /// epoch).
    ///
    /// Idempotent. Revoking an already-expired token records nothing and
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the
    /// backing store cannot be written.
    async fn revoke(&self, token: &str, expires_at: u64) -> Result<()>;

    /// Returns whether `token` has been revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the
    /// backing store cannot be read. Callers gating access must treat an
    /// error as revoked.
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Drops entries whose tokens have expired and returns how many were
    /// removed. Advisory: lookups already ignore expired entries.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the
    /// backing store fails.
    async fn purge_expired(&self) -> Result<u64>;
}

/// A stored revocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// The revoked token string.
    pub token: String,
    /// When the revocation was recorded (seconds since epoch).
    pub recorded_at: u64,
    /// The token's own expiry (seconds since epoch).
    pub expires_at: u64,
}

impl RevocationEntry {
    /// Builds an entry, or `None` if the token is already past its expiry at
    /// `now`.
    #[must_use]
    pub fn new(token: &str, expires_at: u64, now: u64) -> Option<Self> {
        (now <= expires_at).then(|| Self {
            token: token.to_owned(),
            recorded_at: now,
            expires_at,
        })
    }

    /// How long the entry must be retained.
    ///
    /// The token is still valid during its `exp` second, so the entry outlives
    /// that second too. The result is a relative duration and does not follow
    /// later wall-clock adjustments.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expires_at.saturating_add(1).saturating_sub(self.recorded_at))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_for_live_token() {
        let entry = RevocationEntry::new("tok", 1_000, 400).unwrap();
        assert_eq!(entry.recorded_at, 400);
        assert_eq!(entry.ttl(), Duration::from_secs(601));
    }

    #[test]
    fn test_entry_in_final_second() {
        let entry = RevocationEntry::new("tok", 1_000, 1_000).unwrap();
        assert_eq!(entry.ttl(), Duration::from_secs(1));
    }

    #[test]
    fn test_no_entry_for_expired_token() {
        assert!(RevocationEntry::new("tok", 1_000, 1_001).is_none());
    }

    #[test]
    fn test_entry_serializes_as_json() {
        let entry = RevocationEntry::new("tok", 10, 5).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"token": "tok", "recorded_at": 5, "expires_at": 10}));
    }
}
