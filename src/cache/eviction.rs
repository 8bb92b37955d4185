//! Eviction Policies
//!
//! Decide which entries to drop before an insert so a store stays within
//! its `max_entries` bound.
//!
//! [`FifoEviction`] drops keys in the store's enumeration order, which for
//! the shipped stores is insertion order. Reads do not protect a key.
//! [`LruEviction`] tracks recency from hits and inserts instead.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use parking_lot::Mutex;

use crate::cache::RequestKey;

/// Number of entries to drop so that one more insert fits.
pub fn overflow(count: usize, max_entries: usize) -> usize {
    if count >= max_entries {
        count - max_entries + 1
    } else {
        0
    }
}

// == Eviction Policy Trait ==
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Keys to delete before inserting one more entry into `store`.
    ///
    /// `keys` is the store's current key list in enumeration order.
    fn select_victims(
        &self,
        store: &str,
        keys: &[RequestKey],
        max_entries: usize,
    ) -> Vec<RequestKey>;

    /// A cached entry was served.
    fn record_access(&self, _store: &str, _key: &RequestKey) {}

    /// An entry was written.
    fn record_insert(&self, _store: &str, _key: &RequestKey) {}

    /// An entry was deleted.
    fn record_removal(&self, _store: &str, _key: &RequestKey) {}

    /// A whole store was deleted.
    fn forget_store(&self, _store: &str) {}
}

// == FIFO ==
/// Evicts the first keys in enumeration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoEviction;

impl EvictionPolicy for FifoEviction {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn select_victims(
        &self,
        _store: &str,
        keys: &[RequestKey],
        max_entries: usize,
    ) -> Vec<RequestKey> {
        keys.iter()
            .take(overflow(keys.len(), max_entries))
            .cloned()
            .collect()
    }
}

// == Recency Tracker ==
/// Access order for one store.
///
/// Front = most recently used, back = least recently used.
#[derive(Debug, Default)]
struct RecencyTracker {
    order: VecDeque<RequestKey>,
}

impl RecencyTracker {
    /// Marks a key as recently used (moves to front).
    fn touch(&mut self, key: &RequestKey) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    fn remove(&mut self, key: &RequestKey) {
        self.order.retain(|k| k != key);
    }

    /// Tracked keys from least to most recently used.
    fn oldest_first(&self) -> impl Iterator<Item = &RequestKey> {
        self.order.iter().rev()
    }
}

// == LRU ==
/// Evicts the least recently used keys.
///
/// Keys the tracker has never seen (written before this process started, or
/// by someone else) go first, in enumeration order.
#[derive(Debug, Default)]
pub struct LruEviction {
    trackers: Mutex<HashMap<String, RecencyTracker>>,
}

impl LruEviction {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for LruEviction {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn select_victims(
        &self,
        store: &str,
        keys: &[RequestKey],
        max_entries: usize,
    ) -> Vec<RequestKey> {
        let to_delete = overflow(keys.len(), max_entries);
        if to_delete == 0 {
            return Vec::new();
        }

        let trackers = self.trackers.lock();
        let tracked: Vec<&RequestKey> = trackers
            .get(store)
            .map(|t| t.oldest_first().collect())
            .unwrap_or_default();
        let tracked_set: HashSet<&RequestKey> = tracked.iter().copied().collect();
        let present: HashSet<&RequestKey> = keys.iter().collect();

        keys.iter()
            .filter(|k| !tracked_set.contains(k))
            .chain(tracked.into_iter().filter(|k| present.contains(k)))
            .take(to_delete)
            .cloned()
            .collect()
    }

    fn record_access(&self, store: &str, key: &RequestKey) {
        self.trackers
            .lock()
            .entry(store.to_string())
            .or_default()
            .touch(key);
    }

    fn record_insert(&self, store: &str, key: &RequestKey) {
        self.record_access(store, key);
    }

    fn record_removal(&self, store: &str, key: &RequestKey) {
        if let Some(tracker) = self.trackers.lock().get_mut(store) {
            tracker.remove(key);
        }
    }

    fn forget_store(&self, store: &str) {
        self.trackers.lock().remove(store);
    }
}
