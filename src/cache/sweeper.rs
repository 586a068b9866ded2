//! Periodic eviction of expired cache entries
//!
//! Spawns a tokio task that sweeps a shared [`TtlCache`] on a fixed interval.
//! The task only removes entries already past expiry and stops when its
//! handle is shut down or dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ttl::{lock_cache, SharedCache};

/// Spawner for the background sweep task
pub struct CacheSweeper;

/// Handle for stopping a running sweep task
///
/// Dropping the handle closes the shutdown channel, which also stops the task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheSweeper {
    /// Spawns a task that sweeps `cache` every `interval`
    ///
    /// Must be called from within a tokio runtime. The first sweep happens
    /// one full interval after spawning. A zero interval disables the sweep;
    /// expired entries are then only evicted on read.
    pub fn spawn<V>(cache: SharedCache<V>, interval: Duration) -> SweepHandle
    where
        V: Clone + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if interval.is_zero() {
            warn!("sweep interval is zero, periodic sweep disabled");
            return SweepHandle { shutdown_tx };
        }

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first tick (immediate)
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = lock_cache(&cache).sweep();
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        SweepHandle { shutdown_tx }
    }
}

impl SweepHandle {
    /// Stops the sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
