//! In-memory storage backend.
//!
//! [`MemoryBackend`] keeps everything in a [`BTreeMap`] behind a
//! [`parking_lot::RwLock`]. It backs the user store and the persistent
//! revocation store in development and in tests.
//!
//! # Expiry
//!
//! Keys written with [`set_with_ttl`](StorageBackend::set_with_ttl) are
//! hidden from reads as soon as their deadline passes (lazy expiry). A
//! background task removes them for good once per second, and
//! [`purge_expired`](StorageBackend::purge_expired) does the same on demand.
//!
//! # Limitations
//!
//! - Nothing is persisted; all data is lost when the process exits
//! - A single process only; there is no replication

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::{select, sync::watch, time::sleep};

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
};

/// Interval between background cleanup passes.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the shutdown sender. Dropping it closes the watch channel and ends
/// the cleanup task.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// In-memory storage backend.
///
/// Cloning is cheap; all clones share the same data. The cleanup task stops
/// when the last clone is dropped or when [`shutdown`](Self::shutdown) is
/// called.
///
/// Must be created inside a Tokio runtime, since construction spawns the
/// cleanup task.
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
    deadlines: Arc<RwLock<BTreeMap<Vec<u8>, Instant>>>,
    shutdown_guard: Arc<ShutdownGuard>,
}

impl MemoryBackend {
    /// Creates an empty backend and starts its cleanup task.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let backend = Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            deadlines: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_guard: Arc::new(ShutdownGuard { shutdown_tx }),
        };

        let sweeper = backend.clone_without_guard();
        tokio::spawn(async move {
            sweeper.run_cleanup(shutdown_rx).await;
        });

        backend
    }

    /// Stops the background cleanup task.
    ///
    /// Lazy expiry on reads keeps working afterwards; only the periodic
    /// removal stops.
    pub fn shutdown(&self) {
        let _ = self.shutdown_guard.shutdown_tx.send(());
    }

    /// Number of keys currently held, including expired keys that have not
    /// been purged yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if the backend holds no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// A handle sharing the maps but not the guard, so the cleanup task does
    /// not keep the backend alive.
    fn clone_without_guard(&self) -> Sweeper {
        Sweeper { data: Arc::clone(&self.data), deadlines: Arc::clone(&self.deadlines) }
    }

    fn is_expired(&self, key: &[u8]) -> bool {
        self.deadlines.read().get(key).is_some_and(|deadline| *deadline <= Instant::now())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// The data the cleanup task needs, without the shutdown guard.
struct Sweeper {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
    deadlines: Arc<RwLock<BTreeMap<Vec<u8>, Instant>>>,
}

impl Sweeper {
    async fn run_cleanup(&self, mut shutdown_rx: watch::Receiver<()>) {
        loop {
            select! {
                _ = sleep(CLEANUP_INTERVAL) => {}
                _ = shutdown_rx.changed() => return,
            }

            let removed = self.remove_expired();
            if removed > 0 {
                tracing::trace!(removed, "memory backend removed expired keys");
            }
        }
    }

    fn remove_expired(&self) -> u64 {
        let now = Instant::now();
        let expired: Vec<Vec<u8>> = self
            .deadlines
            .read()
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        if expired.is_empty() {
            return 0;
        }

        // Lock order is always data, then deadlines.
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();
        let mut removed = 0;
        for key in expired {
            // The key may have been rewritten without a TTL since the scan.
            if deadlines.get(&key).is_some_and(|deadline| *deadline <= now) {
                data.remove(&key);
                deadlines.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        if self.is_expired(key) {
            return Ok(None);
        }
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();
        deadlines.remove(&key);
        data.insert(key, Bytes::from(value));
        Ok(())
    }

    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        let deadline = Instant::now() + ttl;
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();
        data.insert(key.clone(), Bytes::from(value));
        deadlines.insert(key, deadline);
        Ok(())
    }

    async fn insert_with_ttl(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool> {
        let now = Instant::now();
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();

        let live = data.contains_key(&key)
            && !deadlines.get(&key).is_some_and(|deadline| *deadline <= now);
        if live {
            return Ok(false);
        }

        data.insert(key.clone(), Bytes::from(value));
        deadlines.insert(key, now + ttl);
        Ok(true)
    }

    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();

        let live = !deadlines.get(key).is_some_and(|deadline| *deadline <= Instant::now());
        let current = if live { data.get(key) } else { None };

        let matches = match (expected, current) {
            (None, None) => true,
            (Some(want), Some(have)) => want == &have[..],
            _ => false,
        };
        if !matches {
            return Err(StorageError::conflict());
        }

        data.insert(key.to_vec(), Bytes::from(new_value));
        deadlines.remove(key);
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let mut deadlines = self.deadlines.write();
        data.remove(key);
        deadlines.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> StorageResult<u64> {
        Ok(self.clone_without_guard().remove_expired())
    }

    async fn health_check(&self) -> StorageResult<()> {
        // A poisoned or deadlocked map would hang here rather than return.
        let _unused = self.data.read();
        Ok(())
    }
}
