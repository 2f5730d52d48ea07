//! Bounded FIFO cache for point lookups.
//!
//! Eviction is by insertion order, not recency: reading an entry or
//! overwriting its value never extends its lifetime. Evicted entries are
//! simply dropped since the backend holds the authoritative copy.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Default number of entries held by a [`FifoCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 30;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Fixed-capacity cache with oldest-inserted-first eviction.
///
/// The map and the insertion queue are updated under one lock, so the two
/// always hold the same key set and the cache never exceeds its capacity.
/// A capacity of zero disables caching.
pub struct FifoCache {
    capacity: usize,
    inner: Mutex<FifoInner>,
}

#[derive(Default)]
struct FifoInner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl FifoCache {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(FifoInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                ..FifoInner::default()
            }),
        }
    }

    // The critical sections below never panic, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, FifoInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a value.
    ///
    /// A new key evicts the oldest entry when the cache is full. Replacing
    /// an existing key keeps its original queue position.
    pub fn set(&self, key: &str, value: &str) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.lock();
        if let Some(slot) = inner.entries.get_mut(key) {
            *slot = value.to_string();
            return;
        }
        self.insert_new(&mut inner, key, value);
    }

    /// Insert a value only if the key is not cached. Returns whether it was
    /// inserted.
    ///
    /// Used to fill the cache after a miss without clobbering a value a
    /// concurrent writer cached in the meantime.
    pub fn set_if_absent(&self, key: &str, value: &str) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let mut inner = self.lock();
        if inner.entries.contains_key(key) {
            return false;
        }
        self.insert_new(&mut inner, key, value);
        true
    }

    fn insert_new(&self, inner: &mut FifoInner, key: &str, value: &str) {
        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            inner.evictions += 1;
        }

        inner.order.push_back(key.to_string());
        inner.entries.insert(key.to_string(), value.to_string());
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entry_count: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for FifoCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
