use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::RevocationStore;

/// Shortest accepted sweep interval.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Background task that periodically purges expired revocation entries.
///
/// The task stops when [`shutdown`](Self::shutdown) is called or the sweeper
/// is dropped.
pub struct RevocationSweeper {
    cancel_token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RevocationSweeper {
    /// Spawns the sweep loop on the current Tokio runtime.
    ///
    /// The first sweep runs one full `interval` after spawning. Intervals
    /// shorter than 10ms are raised to 10ms.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime context.
    #[must_use]
    pub fn spawn(store: Arc<dyn RevocationStore>, interval: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("revocation sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match store.purge_expired().await {
                            Ok(0) => {},
                            Ok(purged) => tracing::debug!(purged, "purged expired revocations"),
                            Err(e) => tracing::warn!(error = %e, "revocation sweep failed"),
                        }
                    }
                }
            }
        });

        tracing::debug!(interval = ?interval, "revocation sweeper started");
        Self { cancel_token, handle: Mutex::new(Some(handle)) }
    }

    /// Returns `true` while the sweep task has not finished.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the sweep loop and waits for it to exit.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            tracing::warn!(error = %err, "revocation sweeper task panicked");
        }
    }
}

impl Drop for RevocationSweeper {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl std::fmt::Debug for RevocationSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationSweeper").field("running", &self.is_running()).finish()
    }
}
