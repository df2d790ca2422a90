use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;

use super::{RevocationEntry, RevocationStore};
use crate::{error::Result, jwt::unix_now};

/// Expires each entry when the token it shadows expires.
struct EntryExpiry;

impl moka::Expiry<String, RevocationEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &RevocationEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl())
    }
}

/// Process-local revocation store backed by a [`moka::future::Cache`].
///
/// Lookups never return an entry past its TTL, whether or not moka has
/// physically evicted it yet. The cache has no capacity bound: evicting a
/// live entry would silently un-revoke its token, so memory is bounded only
/// by the number of live revoked tokens.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct InMemoryRevocationStore {
    entries: Cache<String, RevocationEntry>,
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let entries = Cache::builder().expire_after(EntryExpiry).build();
        Self { entries }
    }

    /// Approximate number of retained entries.
    ///
    /// Eventually consistent: pending inserts and expirations are applied by
    /// [`purge_expired`](RevocationStore::purge_expired), whose return value
    /// is approximate for the same reason.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRevocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRevocationStore")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token: &str, expires_at: u64) -> Result<()> {
        let Some(entry) = RevocationEntry::new(token, expires_at, unix_now()) else {
            tracing::debug!(expires_at, "token already expired, nothing to revoke");
            return Ok(());
        };

        // An existing entry already covers the same expiry; keep it.
        self.entries.entry(token.to_owned()).or_insert(entry).await;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        Ok(self.entries.get(token).await.is_some())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let before = self.entries.entry_count();
        self.entries.run_pending_tasks().await;
        let after = self.entries.entry_count();
        Ok(before.saturating_sub(after))
    }
}
