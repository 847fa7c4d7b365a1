//! Background Reaper
//!
//! This module implements the background task that evicts expired entries
//! from both the store and the expiration index.
//!
//! ## Design
//!
//! The reaper runs as a Tokio task and:
//! 1. Sleeps for a fixed interval (default: 11 minutes)
//! 2. Samples "now" once and collects every indexed entry expired by then
//! 3. Deletes each record, then removes it from the index
//! 4. Logs statistics about the cycle
//!
//! Deleting before un-indexing means a crash mid-cycle can only leave an
//! index entry whose record is already gone; the next cycle (or the next
//! reconciliation) sweeps it. A failed delete is logged and the entry stays
//! indexed for the next cycle, the rest of the cycle carries on.
//!
//! The interval only bounds staleness. Reads already refuse expired
//! records, see [`PasteService::fetch`](crate::service::PasteService::fetch).

use crate::storage::index::ExpiryIndex;
use crate::storage::store::{EntryStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Default interval between sweeps.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(11 * 60);

/// Configuration for the reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Interval between sweeps (default: 11 minutes)
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

/// Result of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed from store and index
    pub reclaimed: u64,
    /// Entries whose record could not be deleted
    pub failed: u64,
}

/// Cumulative reaper statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperStats {
    pub sweeps: u64,
    pub reclaimed: u64,
    pub failures: u64,
}

/// Evicts expired entries from a store and its index.
pub struct Reaper {
    store: Arc<dyn EntryStore>,
    index: Arc<ExpiryIndex>,
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
    failures: AtomicU64,
}

impl std::fmt::Debug for Reaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaper")
            .field("indexed", &self.index.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Reaper {
    pub fn new(store: Arc<dyn EntryStore>, index: Arc<ExpiryIndex>) -> Self {
        Self {
            store,
            index,
            sweeps: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Runs one sweep against the current time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Runs one sweep, treating everything expiring at or before `now` as due.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for (id, _) in self.index.expired(now) {
            match self.store.delete(&id) {
                // Already gone counts as reclaimed
                Ok(()) | Err(StoreError::NotFound) => {
                    self.index.remove(&id);
                    report.reclaimed += 1;
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to delete expired entry");
                    report.failed += 1;
                }
            }
        }

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.reclaimed.fetch_add(report.reclaimed, Ordering::Relaxed);
        self.failures.fetch_add(report.failed, Ordering::Relaxed);

        report
    }

    pub fn stats(&self) -> ReaperStats {
        ReaperStats {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// A handle to the running reaper task.
///
/// When this handle is dropped, the reaper task will be stopped.
#[derive(Debug)]
pub struct ReaperHandle {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    reaper: Arc<Reaper>,
}

impl ReaperHandle {
    /// Starts the reaper as a background task.
    ///
    /// # Arguments
    ///
    /// * `reaper` - The reaper to run
    /// * `config` - Configuration for the task
    ///
    /// # Example
    ///
    /// ```ignore
    /// use textdrop::storage::{ExpiryIndex, FsStore, Reaper, ReaperConfig, ReaperHandle};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(FsStore::open(".text")?);
    /// let index = Arc::new(ExpiryIndex::new());
    /// let handle = ReaperHandle::start(Arc::new(Reaper::new(store, index)), ReaperConfig::default());
    ///
    /// // Reaper runs in the background...
    ///
    /// // Dropping the handle will stop it
    /// drop(handle);
    /// ```
    pub fn start(reaper: Arc<Reaper>, config: ReaperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_secs = config.interval.as_secs(),
            "Background reaper started"
        );
        tokio::spawn(reaper_loop(Arc::clone(&reaper), config, shutdown_rx));

        Self {
            shutdown_tx,
            reaper,
        }
    }

    /// The reaper driven by this task.
    pub fn reaper(&self) -> &Arc<Reaper> {
        &self.reaper
    }

    /// Stops the reaper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!("Background reaper stopped");
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main reaper loop.
async fn reaper_loop(
    reaper: Arc<Reaper>,
    config: ReaperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // Wait for the interval or shutdown signal, shutdown first
        tokio::select! {
            biased;
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Reaper received shutdown signal");
                    return;
                }
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        // Record deletion is filesystem work
        let worker = Arc::clone(&reaper);
        let report = match tokio::task::spawn_blocking(move || worker.sweep()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Reaper sweep panicked");
                continue;
            }
        };

        if report.reclaimed > 0 || report.failed > 0 {
            info!(
                reclaimed = report.reclaimed,
                failed = report.failed,
                remaining = reaper.index.len(),
                "Reaper cycle complete"
            );
        }
    }
}

/// Starts the reaper over `store` and `index`.
///
/// This is a convenience function for the common wiring.
pub fn start_reaper(
    store: Arc<dyn EntryStore>,
    index: Arc<ExpiryIndex>,
    config: ReaperConfig,
) -> ReaperHandle {
    ReaperHandle::start(Arc::new(Reaper::new(store, index)), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entry::Entry;
    use crate::storage::store::{FsStore, Listing};
    use chrono::{Duration as TimeDelta, SubsecRound};
    use std::collections::HashSet;
    use std::io;
    use tempfile::tempdir;

    /// Store whose deletes fail for chosen ids.
    struct FlakyStore {
        inner: FsStore,
        failing: HashSet<String>,
    }

    impl EntryStore for FlakyStore {
        fn put(&self, entry: &Entry) -> Result<(), StoreError> {
            self.inner.put(entry)
        }

        fn get(&self, id: &str) -> Result<Entry, StoreError> {
            self.inner.get(id)
        }

        fn delete(&self, id: &str) -> Result<(), StoreError> {
            if self.failing.contains(id) {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "read-only record",
                )));
            }
            self.inner.delete(id)
        }

        fn list_all(&self) -> Result<Listing<'_>, StoreError> {
            self.inner.list_all()
        }
    }

    fn setup() -> (Arc<FsStore>, Arc<ExpiryIndex>, tempfile::TempDir) {
        let temp = tempdir().unwrap();
        let store = Arc::new(FsStore::open(temp.path()).unwrap());
        (store, Arc::new(ExpiryIndex::new()), temp)
    }

    fn insert(store: &dyn EntryStore, index: &ExpiryIndex, id: &str, expires_at: DateTime<Utc>) {
        let expires_at = expires_at.trunc_subsecs(0);
        store.put(&Entry::new(id, expires_at, "value")).unwrap();
        index.set(id, expires_at);
    }

    #[test]
    fn test_sweep_reclaims_expired() {
        let (store, index, _temp) = setup();
        let now = Utc::now();
        for i in 0..10 {
            insert(&*store, &index, &format!("old{}", i), now - TimeDelta::hours(1));
        }
        insert(&*store, &index, "live", now + TimeDelta::hours(1));

        let reaper = Reaper::new(store.clone(), Arc::clone(&index));
        let report = reaper.sweep_at(now);

        assert_eq!(report, SweepReport { reclaimed: 10, failed: 0 });
        assert_eq!(index.len(), 1);
        assert!(index.contains("live"));
        for i in 0..10 {
            assert!(matches!(store.get(&format!("old{}", i)), Err(StoreError::NotFound)));
        }
        assert!(store.get("live").is_ok());
    }

    #[test]
    fn test_sweep_treats_missing_record_as_reclaimed() {
        let (store, index, _temp) = setup();
        let now = Utc::now();
        index.set("ghost", now - TimeDelta::minutes(5));

        let reaper = Reaper::new(store, Arc::clone(&index));
        let report = reaper.sweep_at(now);

        assert_eq!(report.reclaimed, 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_failed_delete_does_not_stop_the_cycle() {
        let (fs_store, index, _temp) = setup();
        let store = Arc::new(FlakyStore {
            inner: (*fs_store).clone(),
            failing: HashSet::from(["stuck".to_string()]),
        });
        let now = Utc::now();
        insert(&*store, &index, "before", now - TimeDelta::hours(2));
        insert(&*store, &index, "stuck", now - TimeDelta::hours(2));
        insert(&*store, &index, "after", now - TimeDelta::hours(2));

        let reaper = Reaper::new(store.clone(), Arc::clone(&index));
        let report = reaper.sweep_at(now);

        assert_eq!(report, SweepReport { reclaimed: 2, failed: 1 });
        assert!(matches!(store.get("before"), Err(StoreError::NotFound)));
        assert!(matches!(store.get("after"), Err(StoreError::NotFound)));

        // Still indexed so the next cycle retries it
        assert!(index.contains("stuck"));
        assert!(store.get("stuck").is_ok());
        assert_eq!(
            reaper.stats(),
            ReaperStats {
                sweeps: 1,
                reclaimed: 2,
                failures: 1
            }
        );
    }

    #[tokio::test]
    async fn test_reaper_cleans_expired_entries() {
        let (store, index, _temp) = setup();
        let now = Utc::now();
        for i in 0..10 {
            insert(&*store, &index, &format!("key{}", i), now - TimeDelta::seconds(1));
        }
        insert(&*store, &index, "persistent", now + TimeDelta::days(1));

        let config = ReaperConfig {
            interval: Duration::from_millis(10),
        };
        let handle = start_reaper(store.clone(), Arc::clone(&index), config);

        // Wait for at least one cycle
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(index.len(), 1);
        assert!(index.contains("persistent"));
        assert!(handle.reaper().stats().sweeps >= 1);
        assert!(matches!(store.get("key0"), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_reaper_stops_on_drop() {
        let (store, index, _temp) = setup();
        let config = ReaperConfig {
            interval: Duration::from_millis(10),
        };

        {
            let _handle = start_reaper(store.clone(), Arc::clone(&index), config);
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Handle is dropped here
        }

        // Let any sweep already in flight finish
        tokio::time::sleep(Duration::from_millis(30)).await;

        insert(&*store, &index, "late", Utc::now() - TimeDelta::seconds(1));

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nothing sweeps once the handle is gone
        assert!(index.contains("late"));
        assert!(store.get("late").is_ok());
    }
}
