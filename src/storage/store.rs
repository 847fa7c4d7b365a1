//! Filesystem Entry Store
//!
//! Durable persistence for entries: one file per entry inside a root
//! directory, file name = entry id, contents = [`Entry::encode`].
//!
//! ## Atomicity
//!
//! ```text
//! put(entry)
//!   1. write  <root>/.<id>.tmp   (create_new, fsync)
//!   2. link   <root>/<id>        (fails if <id> exists, never overwrites)
//!   3. unlink <root>/.<id>.tmp
//! ```
//!
//! A reader therefore sees either no file or a complete one. `delete` is a
//! single unlink, so a read racing a delete either succeeds or gets
//! `NotFound`.
//!
//! Hidden files (leading `.`) are never listed, which keeps in-flight
//! temporaries out of the reconciler's view. A crash between steps 1 and 3
//! leaves the temporary behind; [`EntryStore::purge_staging`] clears those
//! at startup.

use crate::storage::entry::{parse_expiration, DecodeError, Entry, SEPARATOR};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned by an [`EntryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No record exists for the id
    #[error("entry not found")]
    NotFound,

    /// A record already exists for the id
    #[error("entry '{0}' already exists")]
    AlreadyExists(String),

    /// The record exists but cannot be decoded
    #[error("corrupt entry '{id}': {source}")]
    Corrupt {
        id: String,
        #[source]
        source: DecodeError,
    },

    /// The id is not usable as a record name
    #[error("invalid entry id: {0:?}")]
    InvalidId(String),
}

/// An id and expiration as seen by [`EntryStore::list_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

/// Lazily produced listing of every record in a store.
pub type Listing<'a> = Box<dyn Iterator<Item = Result<ListedEntry, StoreError>> + 'a>;

/// Durable storage for entries, keyed by id.
///
/// Operations on different ids never conflict. Implementations must make
/// `delete` atomic with respect to `get`.
pub trait EntryStore: Send + Sync {
    /// Writes a new record. Never overwrites an existing one.
    fn put(&self, entry: &Entry) -> Result<(), StoreError>;

    /// Reads a record. Expiration is not checked here.
    fn get(&self, id: &str) -> Result<Entry, StoreError>;

    /// Removes a record. Returns [`StoreError::NotFound`] if it was already gone.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Streams the id and expiration of every record.
    ///
    /// Only opening the listing can fail as a whole; problems with
    /// individual records are reported per item.
    fn list_all(&self) -> Result<Listing<'_>, StoreError>;

    /// Removes leftovers of interrupted writes and returns how many went.
    ///
    /// Must not run while a `put` may be in flight.
    fn purge_staging(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// Longest id accepted as a record name, well below filesystem name limits.
pub const MAX_ID_LENGTH: usize = 64;

/// Returns true if `id` can name a record: 1 to [`MAX_ID_LENGTH`] ASCII alphanumerics.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_staging_name(name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(is_valid_id)
}

/// [`EntryStore`] backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        if !fs::metadata(&root)?.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }

        Ok(Self { root })
    }

    /// The directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(id))
    }

    fn temp_path(&self, id: &str) -> PathBuf {
        self.root.join(format!(".{id}.tmp"))
    }

    fn write_temp(path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    fn remove_temp(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "Failed to remove temporary file");
            }
        }
    }
}

impl EntryStore for FsStore {
    fn put(&self, entry: &Entry) -> Result<(), StoreError> {
        let path = self.record_path(&entry.id)?;
        let temp = self.temp_path(&entry.id);

        if let Err(e) = Self::write_temp(&temp, entry.encode().as_bytes()) {
            // Another put holds the same id; its temporary is not ours to remove
            if e.kind() == io::ErrorKind::AlreadyExists {
                return Err(StoreError::AlreadyExists(entry.id.clone()));
            }
            Self::remove_temp(&temp);
            return Err(e.into());
        }

        let linked = fs::hard_link(&temp, &path);
        Self::remove_temp(&temp);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(entry.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &str) -> Result<Entry, StoreError> {
        let path = self.record_path(id)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let corrupt = |source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        };
        let contents = String::from_utf8(bytes).map_err(|_| corrupt(DecodeError::InvalidUtf8))?;
        Entry::decode(id, &contents).map_err(corrupt)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(id)?;

        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self) -> Result<Listing<'_>, StoreError> {
        let dir = fs::read_dir(&self.root)?;

        Ok(Box::new(dir.filter_map(|dirent| {
            let dirent = match dirent {
                Ok(dirent) => dirent,
                Err(e) => return Some(Err(e.into())),
            };

            let name = dirent.file_name();
            let id = match name.to_str() {
                Some(name) if name.starts_with('.') => return None,
                Some(name) if is_valid_id(name) => name.to_string(),
                _ => return Some(Err(StoreError::InvalidId(name.to_string_lossy().into_owned()))),
            };

            match dirent.file_type() {
                Ok(kind) if kind.is_file() => {}
                Ok(_) => return None,
                Err(e) => return Some(Err(e.into())),
            }

            match read_expiration(&dirent.path(), &id) {
                Ok(expires_at) => Some(Ok(ListedEntry { id, expires_at })),
                // Removed between the directory read and the open
                Err(StoreError::NotFound) => None,
                Err(e) => Some(Err(e)),
            }
        })))
    }

    fn purge_staging(&self) -> Result<u64, StoreError> {
        let mut purged = 0;

        for dirent in fs::read_dir(&self.root)? {
            let dirent = dirent?;
            let is_staging = dirent.file_name().to_str().is_some_and(is_staging_name);
            if !is_staging || !dirent.file_type()?.is_file() {
                continue;
            }

            match fs::remove_file(dirent.path()) {
                Ok(()) => purged += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %dirent.path().display(), error = %e, "Failed to remove stale temporary");
                }
            }
        }

        Ok(purged)
    }
}

/// Reads only the first line of a record.
fn read_expiration(path: &Path, id: &str) -> Result<DateTime<Utc>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let corrupt = |source| StoreError::Corrupt {
        id: id.to_string(),
        source,
    };

    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).map_err(|e| {
        if e.kind() == io::ErrorKind::InvalidData {
            corrupt(DecodeError::InvalidUtf8)
        } else {
            StoreError::Io(e)
        }
    })?;

    let stamp = line
        .strip_suffix(SEPARATOR)
        .ok_or_else(|| corrupt(DecodeError::MissingSeparator))?;

    parse_expiration(stamp).map_err(|e| corrupt(DecodeError::InvalidTimestamp(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    fn create_store() -> (FsStore, tempfile::TempDir) {
        let temp = tempdir().unwrap();
        let store = FsStore::open(temp.path().join("text")).unwrap();
        (store, temp)
    }

    fn make_entry(id: &str, text: &str) -> Entry {
        Entry::new(id, Utc::now().trunc_subsecs(0) + Duration::hours(1), text)
    }

    #[test]
    fn test_put_and_get() {
        let (store, _temp) = create_store();
        let entry = make_entry("abc123", "hello\nworld");

        assert_ok!(store.put(&entry));

        assert_eq!(store.get("abc123").unwrap(), entry);
    }

    #[test]
    fn test_file_layout() {
        let (store, _temp) = create_store();
        let entry = make_entry("abc123", "hello");
        store.put(&entry).unwrap();

        let raw = fs::read_to_string(store.root().join("abc123")).unwrap();
        assert_eq!(raw, entry.encode());
        // The temporary is gone once the record is linked in
        assert!(!store.root().join(".abc123.tmp").exists());
    }

    #[test]
    fn test_put_never_overwrites() {
        let (store, _temp) = create_store();
        store.put(&make_entry("abc123", "first")).unwrap();

        let err = store.put(&make_entry("abc123", "second")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "abc123"));
        assert_eq!(store.get("abc123").unwrap().text, "first");
    }

    #[test]
    fn test_get_nonexistent() {
        let (store, _temp) = create_store();
        assert!(matches!(store.get("missing"), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let (store, _temp) = create_store();

        for id in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(store.get(id), Err(StoreError::InvalidId(_))));
            assert!(matches!(store.delete(id), Err(StoreError::InvalidId(_))));
        }
        assert!(matches!(
            store.put(&make_entry("../escape", "x")),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_overlong_ids_never_reach_the_filesystem() {
        let (store, _temp) = create_store();
        let longest = "a".repeat(MAX_ID_LENGTH);
        let overlong = "a".repeat(300);

        assert!(is_valid_id(&longest));
        assert!(!is_valid_id(&overlong));
        assert!(matches!(store.get(&longest), Err(StoreError::NotFound)));
        assert!(matches!(store.get(&overlong), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.delete(&overlong), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn test_put_with_pending_temporary() {
        let (store, _temp) = create_store();
        fs::write(store.root().join(".abc123.tmp"), "partial").unwrap();

        let err = store.put(&make_entry("abc123", "hello")).unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "abc123"));
        // The other writer's temporary is left alone
        assert!(store.root().join(".abc123.tmp").exists());
        assert!(!store.root().join("abc123").exists());
    }

    #[test]
    fn test_purge_staging() {
        let (store, _temp) = create_store();
        store.put(&make_entry("kept", "hello")).unwrap();
        fs::write(store.root().join(".orphan.tmp"), "2000-01-01T00:00:00Z\nold").unwrap();
        fs::write(store.root().join(".other.tmp"), "partial").unwrap();
        fs::write(store.root().join(".config"), "not ours").unwrap();

        assert_eq!(store.purge_staging().unwrap(), 2);

        assert!(!store.root().join(".orphan.tmp").exists());
        assert!(!store.root().join(".other.tmp").exists());
        assert!(store.root().join(".config").exists());
        assert_eq!(store.get("kept").unwrap().text, "hello");
        assert_eq!(store.purge_staging().unwrap(), 0);
    }

    #[test]
    fn test_get_corrupt_record() {
        let (store, _temp) = create_store();
        fs::write(store.root().join("broken"), "not a timestamp\ntext").unwrap();

        let err = store.get("broken").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref id, .. } if id == "broken"));
    }

    #[test]
    fn test_delete() {
        let (store, _temp) = create_store();
        store.put(&make_entry("abc123", "hello")).unwrap();

        assert_ok!(store.delete("abc123"));
        assert!(matches!(store.get("abc123"), Err(StoreError::NotFound)));
        assert!(matches!(store.delete("abc123"), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_list_all() {
        let (store, _temp) = create_store();
        let first = make_entry("first", "one");
        let second = make_entry("second", "two\nlines");
        store.put(&first).unwrap();
        store.put(&second).unwrap();

        // In-flight temporaries and subdirectories are not records
        fs::write(store.root().join(".third.tmp"), "partial").unwrap();
        fs::create_dir(store.root().join("nested")).unwrap();

        let listed: HashMap<String, DateTime<Utc>> = store
            .list_all()
            .unwrap()
            .map(|item| {
                let item = item.unwrap();
                (item.id, item.expires_at)
            })
            .collect();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed["first"], first.expires_at);
        assert_eq!(listed["second"], second.expires_at);
    }

    #[test]
    fn test_list_all_reports_bad_records() {
        let (store, _temp) = create_store();
        store.put(&make_entry("good", "ok")).unwrap();
        fs::write(store.root().join("nonewline"), "2026-10-19T18:00:00Z").unwrap();
        fs::write(store.root().join("badstamp"), "yesterday\ntext").unwrap();

        let (ok, bad): (Vec<_>, Vec<_>) = store.list_all().unwrap().partition(|r| r.is_ok());

        assert_eq!(ok.len(), 1);
        assert_eq!(bad.len(), 2);
        for err in bad {
            assert!(matches!(err, Err(StoreError::Corrupt { .. })));
        }
    }

    #[test]
    fn test_open_rejects_file_root() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("plain");
        fs::write(&path, "x").unwrap();

        assert!(FsStore::open(&path).is_err());
    }
}
