//! Storage backend trait definition.
//!
//! [`StorageBackend`] is a small byte-oriented key-value interface. The user
//! store and the persistent revocation store are both layered on top of it,
//! keeping serialization and key layout out of the backends themselves.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// Abstract storage backend for key-value operations.
///
/// Implementations must be safe for concurrent use from many request tasks.
/// A write that has returned `Ok` must be visible to every subsequent read,
/// from any task.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](StorageBackend::get) | Retrieve a value by key |
/// | [`set`](StorageBackend::set) | Store a value without expiry |
/// | [`set_with_ttl`](StorageBackend::set_with_ttl) | Store a value that expires |
/// | [`insert_with_ttl`](StorageBackend::insert_with_ttl) | Store an expiring value only if absent |
/// | [`compare_and_set`](StorageBackend::compare_and_set) | Atomic conditional write |
/// | [`delete`](StorageBackend::delete) | Remove a key |
/// | [`purge_expired`](StorageBackend::purge_expired) | Drop expired entries eagerly |
/// | [`health_check`](StorageBackend::health_check) | Verify availability |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use tokengate_storage::{MemoryBackend, StorageBackend};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let backend = MemoryBackend::new();
///
/// backend.set(b"key".to_vec(), b"value".to_vec()).await.unwrap();
/// assert_eq!(backend.get(b"key").await.unwrap(), Some(Bytes::from("value")));
/// # });
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key.
    ///
    /// Keys whose TTL has elapsed are reported as absent even if a cleanup
    /// pass has not removed them yet.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Stores a key-value pair, overwriting any previous value and clearing
    /// any TTL the key had.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Stores a key-value pair that expires after `ttl`.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()>;

    /// Atomically stores an expiring value unless the key already holds a
    /// live one.
    ///
    /// Returns `true` if the value was written. An existing live value and
    /// its deadline are left untouched and `false` is returned. An expired
    /// key counts as absent.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn insert_with_ttl(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool>;

    /// Atomically writes `new_value` if the current value equals `expected`.
    ///
    /// - `expected: None` is insert-if-absent. An expired key counts as absent.
    /// - `expected: Some(v)` is update-if-unchanged, compared byte for byte.
    ///
    /// On success any TTL on the key is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`](crate::StorageError::Conflict) when
    /// the precondition does not hold.
    #[must_use = "compare-and-set may fail with a conflict and errors must be handled"]
    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()>;

    /// Deletes a key. Deleting a missing key is not an error.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Removes entries whose TTL has elapsed and returns how many were removed.
    ///
    /// Backends with native expiry have nothing to do here, which is what the
    /// default implementation reports.
    async fn purge_expired(&self) -> StorageResult<u64> {
        Ok(0)
    }

    /// Verifies that the backend can serve requests.
    #[must_use = "health check results indicate backend availability and must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;
}
