//! Expiration Index
//!
//! An in-memory map from entry id to expiration timestamp. It lets the
//! reaper find expired entries without reading every record on disk.
//!
//! The index is never persisted: the reconciler rebuilds it from the
//! store on every start, so losing it is harmless.
//!
//! ## Locking
//!
//! A single `RwLock` guards the map. Every mutation takes the write lock;
//! iteration works on a snapshot taken under the read lock, so callers may
//! mutate the index from inside [`ExpiryIndex::for_each`].

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct ExpiryIndex {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // every mutation is a single HashMap call.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the expiration for an id.
    ///
    /// Returns the previous expiration if the id was already indexed.
    pub fn set(&self, id: impl Into<String>, expires_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.write().insert(id.into(), expires_at)
    }

    /// Returns the indexed expiration for an id.
    pub fn get(&self, id: &str) -> Option<DateTime<Utc>> {
        self.read().get(id).copied()
    }

    /// Removes an id. Returns `true` if it was present.
    pub fn remove(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `f` for every indexed entry.
    ///
    /// Runs over a snapshot: the lock is released before `f` is first
    /// called, and changes made meanwhile are not observed.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, DateTime<Utc>),
    {
        let snapshot: Vec<(String, DateTime<Utc>)> = self
            .read()
            .iter()
            .map(|(id, ts)| (id.clone(), *ts))
            .collect();

        for (id, ts) in &snapshot {
            f(id, *ts);
        }
    }

    /// Returns every entry whose expiration is at or before `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<(String, DateTime<Utc>)> {
        let mut due = Vec::new();
        self.for_each(|id, ts| {
            if ts <= now {
                due.push((id.to_string(), ts));
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let index = ExpiryIndex::new();
        let ts = Utc::now();

        assert_eq!(index.set("abc", ts), None);
        assert_eq!(index.get("abc"), Some(ts));
        assert!(index.contains("abc"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let index = ExpiryIndex::new();
        assert_eq!(index.get("missing"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove() {
        let index = ExpiryIndex::new();
        index.set("abc", Utc::now());

        assert!(index.remove("abc"));
        assert!(!index.remove("abc"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_expired_boundary() {
        let index = ExpiryIndex::new();
        let now = Utc::now();
        index.set("past", now - Duration::hours(1));
        index.set("exact", now);
        index.set("future", now + Duration::hours(1));

        let mut due: Vec<String> = index.expired(now).into_iter().map(|(id, _)| id).collect();
        due.sort();

        assert_eq!(due, vec!["exact".to_string(), "past".to_string()]);
    }

    #[test]
    fn test_for_each_allows_removal() {
        let index = ExpiryIndex::new();
        for i in 0..100 {
            index.set(format!("key{}", i), Utc::now());
        }

        let mut visited = 0;
        index.for_each(|id, _| {
            assert!(index.remove(id));
            visited += 1;
        });

        assert_eq!(visited, 100);
        assert!(index.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let index = Arc::new(ExpiryIndex::new());
        let mut handles = vec![];

        for i in 0..10 {
            let index = Arc::clone(&index);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let id = format!("key{}x{}", i, j);
                    index.set(id.clone(), Utc::now());
                    assert!(index.get(&id).is_some());
                }
            }));
        }

        // A sweeper running alongside the writers
        let sweeper = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for _ in 0..20 {
                    let _ = index.expired(Utc::now() - Duration::days(1));
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        sweeper.join().unwrap();

        assert_eq!(index.len(), 1000);
    }
}
