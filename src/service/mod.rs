//! Service Module
//!
//! This module sits between the HTTP layer and storage. It validates
//! requests, picks identifiers and expirations, and talks to the
//! [`EntryStore`](crate::storage::EntryStore) and
//! [`ExpiryIndex`](crate::storage::ExpiryIndex).
//!
//! ## Modules
//!
//! - `expiration`: The five expiration classes and their durations
//! - `id`: Random identifier generation
//! - `handler`: `PasteService`, the save/fetch operations
//!
//! ## Example
//!
//! ```
//! use textdrop::service::PasteService;
//! use textdrop::storage::{ExpiryIndex, FsStore};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Arc::new(FsStore::open(dir.path()).unwrap());
//! let service = PasteService::new(store, Arc::new(ExpiryIndex::new()));
//!
//! let id = service.save("hello", "day").unwrap();
//! assert_eq!(service.fetch(&id).unwrap().text, "hello");
//! ```

pub mod expiration;
pub mod handler;
pub mod id;

// Re-export the main service types
pub use expiration::{ExpirationClass, InvalidExpiration};
pub use handler::{PasteService, ServiceError};
pub use id::{generate, generate_with, DEFAULT_ID_LENGTH};
