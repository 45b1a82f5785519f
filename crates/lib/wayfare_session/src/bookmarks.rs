//! Locally persisted bookmarks.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::storage::KeyValueStore;

/// Storage key for the bookmarked experience ids (a JSON array).
pub const BOOKMARKS_KEY: &str = "bookmarks";

/// Set of bookmarked experience ids, written through on every change.
pub struct BookmarkStore {
    ids: RwLock<BTreeSet<u64>>,
    persistence: Arc<dyn KeyValueStore>,
}

impl BookmarkStore {
    /// Load bookmarks from `persistence`. Unreadable data starts empty.
    pub fn hydrate(persistence: Arc<dyn KeyValueStore>) -> Self {
        let ids = match persistence.get(BOOKMARKS_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring corrupt bookmarks");
                BTreeSet::new()
            }),
            None => BTreeSet::new(),
        };
        Self {
            ids: RwLock::new(ids),
            persistence,
        }
    }

    /// Returns `false` if `id` was already bookmarked.
    pub fn add(&self, id: u64) -> bool {
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let added = ids.insert(id);
        if added {
            self.persist(&ids);
        }
        added
    }

    /// Returns `false` if `id` was not bookmarked.
    pub fn remove(&self, id: u64) -> bool {
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let removed = ids.remove(&id);
        if removed {
            self.persist(&ids);
        }
        removed
    }

    /// Add or remove `id`; returns whether it is bookmarked afterwards.
    pub fn toggle(&self, id: u64) -> bool {
        if self.contains(id) {
            !self.remove(id)
        } else {
            self.add(id)
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Bookmarked ids in ascending order.
    pub fn list(&self) -> Vec<u64> {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, ids: &BTreeSet<u64>) {
        let result = serde_json::to_string(ids)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.persistence
                    .set(BOOKMARKS_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "failed to persist bookmarks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    #[test]
    fn add_and_remove_write_through() {
        let persistence = Arc::new(MemoryStore::new());
        let bookmarks = BookmarkStore::hydrate(persistence.clone());

        assert!(bookmarks.add(7));
        assert!(bookmarks.add(3));
        assert!(!bookmarks.add(7));
        assert_eq!(persistence.get(BOOKMARKS_KEY).as_deref(), Some("[3,7]"));

        assert!(bookmarks.remove(7));
        assert!(!bookmarks.remove(7));
        assert_eq!(bookmarks.list(), vec![3]);
        assert_eq!(persistence.get(BOOKMARKS_KEY).as_deref(), Some("[3]"));
    }

    #[test]
    fn hydrates_existing_ids() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.set(BOOKMARKS_KEY, "[12, 4, 12]").unwrap();

        let bookmarks = BookmarkStore::hydrate(persistence);
        assert_eq!(bookmarks.list(), vec![4, 12]);
        assert!(bookmarks.contains(12));
    }

    #[test]
    fn corrupt_data_hydrates_empty() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.set(BOOKMARKS_KEY, "{not json").unwrap();

        let bookmarks = BookmarkStore::hydrate(persistence);
        assert!(bookmarks.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let bookmarks = BookmarkStore::hydrate(Arc::new(MemoryStore::new()));
        assert!(bookmarks.toggle(5));
        assert!(!bookmarks.toggle(5));
        assert!(bookmarks.is_empty());
    }

    #[test]
    fn survives_reopen_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        {
            let bookmarks = BookmarkStore::hydrate(Arc::new(FileStore::open(&path).unwrap()));
            bookmarks.add(21);
        }

        let reopened = BookmarkStore::hydrate(Arc::new(FileStore::open(&path).unwrap()));
        assert_eq!(reopened.list(), vec![21]);
    }
}
