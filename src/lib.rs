//! # textdrop - Ephemeral Text Sharing
//!
//! textdrop is a small HTTP service for sharing text that disappears on
//! its own. Clients POST a text blob with a coarse time-to-live and get a
//! random identifier back; anyone holding the identifier can GET the text
//! until it expires.
//!
//! ## Features
//!
//! - **Filesystem Storage**: One file per entry, written atomically
//! - **Expiration Index**: In-memory id -> expiration map, rebuilt at startup
//! - **Startup Reconciliation**: Expired entries are purged before serving
//! - **Background Reaper**: A Tokio task evicts expired entries on a fixed interval
//! - **Async I/O**: Built on Tokio and axum
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              textdrop                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ HTTP Server │───>│   Routes    │───>│   Paste     │                  │
//! │  │   (axum)    │    │  (http)     │    │  Service    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │  FsStore (one file per entry)  ExpiryIndex   │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                          ▲                          ▲                   │
//! │                          │                          │                   │
//! │       ┌──────────────────┴──────┐    ┌──────────────┴───────────────┐   │
//! │       │  reconcile() at startup │    │   Reaper                     │   │
//! │       │  (blocking, runs once)  │    │   (Background Tokio Task)    │   │
//! │       └─────────────────────────┘    └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use textdrop::http::router;
//! use textdrop::service::PasteService;
//! use textdrop::storage::{reconcile, start_reaper, EntryStore, ExpiryIndex, FsStore, ReaperConfig};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn EntryStore> = Arc::new(FsStore::open(".text")?);
//!     let index = Arc::new(ExpiryIndex::new());
//!
//!     // Purge expired entries and rebuild the index before serving
//!     reconcile(store.as_ref(), &index)?;
//!
//!     // Start the background reaper
//!     let _reaper = start_reaper(Arc::clone(&store), Arc::clone(&index), ReaperConfig::default());
//!
//!     let app = router(PasteService::new(store, index), None);
//!     let listener = TcpListener::bind("127.0.0.1:5000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Entry store, expiration index, reconciler and reaper
//! - [`service`]: Validation, identifier generation, save/fetch
//! - [`http`]: axum routes and error mapping
//! - [`config`]: Command-line and environment configuration

pub mod config;
pub mod http;
pub mod service;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::Config;
pub use service::{ExpirationClass, PasteService, ServiceError};
pub use storage::{
    reconcile, start_reaper, Entry, EntryStore, ExpiryIndex, FsStore, ReaperConfig, ReaperHandle,
    StoreError,
};

/// The default port textdrop listens on
pub const DEFAULT_PORT: u16 = 5000;

/// The default host textdrop binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default storage root, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = ".text";

/// Version of textdrop
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
