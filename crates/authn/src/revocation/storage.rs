use async_trait::async_trait;
use fail::fail_point;
use tokengate_storage::{StorageBackend, StorageError};

use super::{RevocationEntry, RevocationStore};
use crate::{
    error::{AuthError, Result},
    jwt::unix_now,
};

/// Key prefix for revocation entries.
pub const REVOCATION_PREFIX: &str = "revoked-tokens/";

/// Revocation store persisted through a [`StorageBackend`].
///
/// Each revocation is a JSON [`RevocationEntry`] under
/// `revoked-tokens/{token}`, written with a TTL equal to the entry's
/// retention so the backend expires it on its own. A live entry is never
/// rewritten.
#[derive(Clone, Debug)]
pub struct StorageRevocationStore<B> {
    backend: B,
}

impl<B: StorageBackend> StorageRevocationStore<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(token: &str) -> Vec<u8> {
        format!("{REVOCATION_PREFIX}{token}").into_bytes()
    }
}

#[async_trait]
impl<B: StorageBackend> RevocationStore for StorageRevocationStore<B> {
    #[tracing::instrument(skip_all, fields(expires_at = expires_at))]
    async fn revoke(&self, token: &str, expires_at: u64) -> Result<()> {
        fail_point!("revocation-before-insert", |_| {
            Err(AuthError::storage(StorageError::connection(
                "injected failure before revocation insert",
            )))
        });

        let Some(entry) = RevocationEntry::new(token, expires_at, unix_now()) else {
            tracing::debug!("token already expired, nothing to revoke");
            return Ok(());
        };

        let value = serde_json::to_vec(&entry).map_err(StorageError::from)?;
        if !self.backend.insert_with_ttl(Self::key(token), value, entry.ttl()).await? {
            tracing::debug!("token already revoked");
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn is_revoked(&self, token: &str) -> Result<bool> {
        fail_point!("revocation-before-lookup", |_| {
            Err(AuthError::storage(StorageError::connection(
                "injected failure before revocation lookup",
            )))
        });

        Ok(self.backend.get(&Self::key(token)).await?.is_some())
    }

    async fn purge_expired(&self) -> Result<u64> {
        Ok(self.backend.purge_expired().await?)
    }
}
