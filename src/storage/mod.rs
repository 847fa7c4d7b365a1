//! Storage Module
//!
//! This module provides the expiration subsystem for textdrop: durable
//! per-entry records, the in-memory expiration index, the startup
//! reconciler and the background reaper.
//!
//! ## Architecture
//!
//! ```text
//!        startup (once)                     background (forever)
//!  ┌───────────────────────┐            ┌───────────────────────────┐
//!  │      reconcile()      │            │          Reaper           │
//!  │ purge expired records │            │  sweep every interval     │
//!  │ index the live ones   │            │  (Background Tokio Task)  │
//!  └─────┬───────────┬─────┘            └──────┬─────────────┬──────┘
//!        │           │                         │             │
//!        ▼           ▼                         ▼             ▼
//!  ┌───────────┐  ┌───────────────────────────────┐   ┌───────────┐
//!  │  FsStore  │  │          ExpiryIndex          │   │  FsStore  │
//!  │ one file  │  │  id -> expires_at (RwLock)    │   │  delete   │
//!  │ per entry │  └───────────────────────────────┘   └───────────┘
//!  └───────────┘
//! ```
//!
//! ## Features
//!
//! - **Atomic records**: written through a temporary file and a hard link
//! - **Streaming listing**: the reconciler never loads the whole store
//! - **Snapshot sweeps**: the reaper iterates a copy of the index
//! - **Isolated failures**: one bad record never stops a sweep
//!
//! ## Example
//!
//! ```
//! use textdrop::storage::{reconcile, Entry, EntryStore, ExpiryIndex, FsStore, Reaper};
//! use chrono::{Duration, SubsecRound, Utc};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Arc::new(FsStore::open(dir.path()).unwrap());
//! let index = Arc::new(ExpiryIndex::new());
//!
//! let expires_at = Utc::now().trunc_subsecs(0) + Duration::hours(1);
//! store.put(&Entry::new("abc", expires_at, "hello")).unwrap();
//!
//! // Rebuild the index from disk
//! let report = reconcile(&*store, &index).unwrap();
//! assert_eq!(report.cached, 1);
//!
//! // Nothing is due yet
//! let reaper = Reaper::new(store, index);
//! assert_eq!(reaper.sweep().reclaimed, 0);
//! ```

pub mod entry;
pub mod expiry;
pub mod index;
pub mod reconcile;
pub mod store;

// Re-export commonly used types
pub use entry::{format_expiration, parse_expiration, DecodeError, Entry};
pub use expiry::{start_reaper, Reaper, ReaperConfig, ReaperHandle, ReaperStats, SweepReport};
pub use index::ExpiryIndex;
pub use reconcile::{reconcile, reconcile_at, ReconcileReport};
pub use store::{is_valid_id, EntryStore, FsStore, ListedEntry, Listing, StoreError, MAX_ID_LENGTH};
