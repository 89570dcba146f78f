//! Per-parent, name-keyed identity cache
//!
//! Each collection of child objects under a parent gets one cache. A cache
//! guarantees at most one live wrapper per key and remembers whether the
//! backing children have been fully enumerated.

use indexmap::IndexMap;

use super::ObjectId;
use crate::util::fold_key;

/// Enumeration state of a cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Only individually looked-up or added children are cached
    #[default]
    NotScanned,
    /// A full enumeration is walking the backing nodes
    Scanning,
    /// Every backing child is cached; enumerations are served from the cache
    Complete,
}

/// Insertion-ordered map from case-folded key to object.
#[derive(Debug, Clone, Default)]
pub struct IdentityCache {
    entries: IndexMap<String, ObjectId>,
    state: ScanState,
}

impl IdentityCache {
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ScanState::Complete
    }

    pub fn get(&self, key: &str) -> Option<ObjectId> {
        self.entries.get(&fold_key(key)).copied()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.values().any(|&v| v == id)
    }

    /// Objects in cache order.
    pub fn values(&self) -> Vec<ObjectId> {
        self.entries.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register an object under `key`, appending it to the cache order.
    pub fn insert(&mut self, key: &str, id: ObjectId) {
        self.entries.insert(fold_key(key), id);
    }

    /// Evict the entry for `id` under `key`. Falls back to a scan by value so
    /// a stale key never leaves the object behind.
    pub fn evict(&mut self, key: &str, id: ObjectId) -> bool {
        let folded = fold_key(key);
        if self.entries.get(&folded) == Some(&id) {
            self.entries.shift_remove(&folded);
            return true;
        }
        let before = self.entries.len();
        self.entries.retain(|_, v| *v != id);
        self.entries.len() != before
    }

    /// Move `id` from `old_key` to `new_key`, keeping its position.
    pub fn rekey(&mut self, old_key: &str, new_key: &str, id: ObjectId) {
        let old = fold_key(old_key);
        let index = match self.entries.get_index_of(&old) {
            Some(i) if self.entries[i] == id => i,
            _ => match self.entries.values().position(|&v| v == id) {
                Some(i) => i,
                None => return,
            },
        };
        self.entries.shift_remove_index(index);
        self.entries.shift_insert(index, fold_key(new_key), id);
    }

    pub(crate) fn begin_scan(&mut self) {
        debug_assert_ne!(
            self.state,
            ScanState::Scanning,
            "collection enumerated while already being enumerated"
        );
        self.state = ScanState::Scanning;
    }

    /// Replace the entries with a full scan result in document order.
    pub(crate) fn finish_scan(&mut self, scanned: IndexMap<String, ObjectId>) {
        self.entries = scanned;
        self.state = ScanState::Complete;
    }
}
