//! Paste Service
//!
//! This module implements the request-handling core of textdrop: input
//! validation, saving new entries and fetching existing ones. It is
//! transport-agnostic; the [`http`](crate::http) module maps its results
//! onto HTTP responses.
//!
//! ## Operations
//!
//! - `save(text, expiration)` - Validate, generate an id, persist, index
//! - `fetch(id)` - Read an entry, refusing expired ones
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PasteService                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  validate   │───>│ generate id │───>│ store.put   │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                        index.set            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stale reads
//!
//! An entry past its expiration but not yet reaped is reported as not
//! found. `fetch` never deletes it; removal stays with the reaper.

use crate::service::expiration::{ExpirationClass, InvalidExpiration};
use crate::service::id::{self, DEFAULT_ID_LENGTH};
use crate::storage::{is_valid_id, Entry, EntryStore, ExpiryIndex, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// How many fresh identifiers `save` tries before giving up.
const MAX_ID_ATTEMPTS: usize = 3;

/// Errors reported to callers of the service.
///
/// The messages are the ones clients see.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing field: id")]
    MissingId,

    #[error("Missing field: text")]
    MissingText,

    #[error("Missing or invalid field: expiration")]
    InvalidExpiration(#[from] InvalidExpiration),

    #[error("Text not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ServiceError {
    /// True for errors caused by the request itself.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingId | ServiceError::MissingText | ServiceError::InvalidExpiration(_)
        )
    }
}

/// Saves and fetches entries against a shared store and index.
#[derive(Clone)]
pub struct PasteService {
    store: Arc<dyn EntryStore>,
    index: Arc<ExpiryIndex>,
    id_length: usize,
}

impl std::fmt::Debug for PasteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteService")
            .field("indexed", &self.index.len())
            .field("id_length", &self.id_length)
            .finish()
    }
}

impl PasteService {
    /// Creates a service over the given store and index.
    pub fn new(store: Arc<dyn EntryStore>, index: Arc<ExpiryIndex>) -> Self {
        Self {
            store,
            index,
            id_length: DEFAULT_ID_LENGTH,
        }
    }

    /// Sets the length of generated identifiers.
    pub fn with_id_length(mut self, id_length: usize) -> Self {
        self.id_length = id_length;
        self
    }

    pub fn index(&self) -> &Arc<ExpiryIndex> {
        &self.index
    }

    /// Saves `text` with the given expiration class and returns its new id.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::MissingText`] if `text` is empty
    /// - [`ServiceError::InvalidExpiration`] unless `expiration` is one of
    ///   `hour`, `day`, `week`, `month`, `year`
    /// - [`ServiceError::Storage`] if the record cannot be written
    ///
    /// Nothing is written or indexed when validation fails.
    pub fn save(&self, text: &str, expiration: &str) -> Result<String, ServiceError> {
        self.save_at(text, expiration, Utc::now())
    }

    /// Same as [`save`](Self::save) with an explicit creation time.
    pub fn save_at(
        &self,
        text: &str,
        expiration: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        if text.is_empty() {
            return Err(ServiceError::MissingText);
        }
        let class: ExpirationClass = expiration.parse()?;
        let expires_at = class.expires_at(now);

        let mut attempt = 1;
        loop {
            let entry = Entry::new(id::generate(self.id_length), expires_at, text);

            match self.store.put(&entry) {
                Ok(()) => {
                    self.index.set(entry.id.clone(), expires_at);
                    debug!(id = %entry.id, expiration = %class, bytes = text.len(), "Saved entry");
                    return Ok(entry.id);
                }
                Err(StoreError::AlreadyExists(id)) if attempt < MAX_ID_ATTEMPTS => {
                    warn!(id = %id, attempt = attempt, "Identifier collision, regenerating");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetches the entry stored under `id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::MissingId`] if `id` is empty
    /// - [`ServiceError::NotFound`] if there is no such entry, the id could
    ///   not name one, or the entry has expired
    /// - [`ServiceError::Storage`] if the record cannot be read
    pub fn fetch(&self, id: &str) -> Result<Entry, ServiceError> {
        self.fetch_at(id, Utc::now())
    }

    /// Same as [`fetch`](Self::fetch) with an explicit clock reading.
    pub fn fetch_at(&self, id: &str, now: DateTime<Utc>) -> Result<Entry, ServiceError> {
        if id.is_empty() {
            return Err(ServiceError::MissingId);
        }
        if !is_valid_id(id) {
            return Err(ServiceError::NotFound);
        }

        let entry = match self.store.get(id) {
            Ok(entry) => entry,
            Err(StoreError::NotFound) => return Err(ServiceError::NotFound),
            Err(e) => return Err(e.into()),
        };

        if entry.is_expired_at(now) {
            debug!(id = %id, "Entry expired, awaiting reaper");
            return Err(ServiceError::NotFound);
        }

        Ok(entry)
    }
}
