//! Startup Reconciliation
//!
//! Runs once, before the server accepts requests. It walks every record
//! in the store and:
//!
//! ```text
//!   .<id>.tmp leftover  ──>  delete file          (discarded)
//!   expires_at <= now   ──>  delete record        (reclaimed)
//!   expires_at >  now   ──>  index.set(id, ts)    (cached)
//!   unreadable/corrupt  ──>  log, leave on disk   (anomaly)
//! ```
//!
//! `now` is sampled once at the start so the whole pass uses one cutoff.
//! A corrupt record is never indexed, so it can never be handed a bogus
//! expiration.

use crate::storage::index::ExpiryIndex;
use crate::storage::store::{EntryStore, StoreError};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Expired records deleted from the store
    pub reclaimed: u64,
    /// Live records inserted into the index
    pub cached: u64,
    /// Records that could not be read, parsed or deleted
    pub anomalies: u64,
    /// Temporaries left behind by interrupted writes
    pub discarded: u64,
}

/// Rebuilds `index` from `store`, purging expired records.
///
/// Fails only if the store cannot be listed at all.
pub fn reconcile(store: &dyn EntryStore, index: &ExpiryIndex) -> Result<ReconcileReport, StoreError> {
    reconcile_at(store, index, Utc::now())
}

/// Same as [`reconcile`] with an explicit cutoff.
pub fn reconcile_at(
    store: &dyn EntryStore,
    index: &ExpiryIndex,
    now: DateTime<Utc>,
) -> Result<ReconcileReport, StoreError> {
    let mut report = ReconcileReport::default();

    // Nothing is serving yet, so no put can own these
    match store.purge_staging() {
        Ok(discarded) => report.discarded = discarded,
        Err(e) => {
            warn!(error = %e, "Failed to purge stale temporaries");
            report.anomalies += 1;
        }
    }

    for item in store.list_all()? {
        let listed = match item {
            Ok(listed) => listed,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                report.anomalies += 1;
                continue;
            }
        };

        if listed.expires_at > now {
            index.set(listed.id, listed.expires_at);
            report.cached += 1;
            continue;
        }

        match store.delete(&listed.id) {
            Ok(()) | Err(StoreError::NotFound) => report.reclaimed += 1,
            Err(e) => {
                warn!(id = %listed.id, error = %e, "Failed to delete expired entry");
                report.anomalies += 1;
            }
        }
    }

    info!(
        reclaimed = report.reclaimed,
        cached = report.cached,
        anomalies = report.anomalies,
        discarded = report.discarded,
        "Reconciliation complete"
    );

    Ok(report)
}
