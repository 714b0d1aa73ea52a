//! Duplicate-index housekeeping.
//!
//! Entries whose `last_seen + ttl` lies in the past are evicted. A sweep
//! works on a snapshot of the index and evicts with compare-and-delete, so
//! an entry refreshed by a concurrent encode after the snapshot survives.
//!
//! Sweeps run either inline on every encode or on an interval through
//! [`ExpirySweeper`]. Both remove the same entries.

use jiff::{SignedDuration, Timestamp};
use snip_core::{Clock, DuplicateIndex, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Evicts stale duplicate-index entries from a store.
pub struct ExpiryHousekeeper<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ExpiryHousekeeper<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DuplicateIndex + ?Sized> ExpiryHousekeeper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Removes every entry that expired before `now` and returns how many
    /// were removed. A non-positive `ttl` disables deduplication, so there
    /// is nothing to sweep.
    pub async fn sweep(&self, now: Timestamp, ttl: SignedDuration) -> Result<usize, StorageError> {
        if ttl <= SignedDuration::ZERO {
            return Ok(0);
        }

        let snapshot = self.store.list_duplicates().await?;
        let scanned = snapshot.len();
        let mut removed = 0;

        for entry in snapshot.iter().filter(|entry| !entry.is_live(now, ttl)) {
            if self.store.evict_duplicate(entry).await? {
                trace!(url_hash = %entry.url_hash, code = %entry.code, "evicted stale duplicate entry");
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(scanned, removed, "duplicate index swept");
        }
        Ok(removed)
    }
}

/// A handle to the running background sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns a task that sweeps every `interval`, reading time from `clock`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, C>(
        housekeeper: ExpiryHousekeeper<S>,
        clock: Arc<C>,
        ttl: SignedDuration,
        interval: Duration,
    ) -> Self
    where
        S: DuplicateIndex + ?Sized,
        C: Clock + ?Sized,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(housekeeper, clock, ttl, interval, shutdown_rx));

        info!(interval_ms = interval.as_millis() as u64, "background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper. Called automatically on drop.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop<S, C>(
    housekeeper: ExpiryHousekeeper<S>,
    clock: Arc<C>,
    ttl: SignedDuration,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    S: DuplicateIndex + ?Sized,
    C: Clock + ?Sized,
{
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        if let Err(e) = housekeeper.sweep(clock.now(), ttl).await {
            warn!(error = %e, "background sweep failed");
        }
    }
}
