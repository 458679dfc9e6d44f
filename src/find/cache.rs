//! Result cache for triple pattern lookups
//!
//! Maps an exact [`TriplePattern`] to the fully materialized list of triples
//! it produced. Entries leave the cache on LRU pressure or through
//! [`TripleCache::clear`]; since the graph is read-only there is no
//! invalidation on write.
//!
//! # Configuration
//!
//! Environment variables (see [`crate::config::EngineConfig`]):
//! - `RDBGRAPH_CACHE_ENABLED` (default: true)
//! - `RDBGRAPH_CACHE_MAX_ENTRIES` (default: 1000)
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use oxrdf::Triple;
use parking_lot::Mutex;

use super::pattern::TriplePattern;
use crate::config::EngineConfig;

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    /// Towards the most recently used end.
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity map with least-recently-used eviction.
///
/// Entries live in an arena of slots linked into a recency list; the hash
/// index points into the arena, so lookups and evictions are O(1).
#[derive(Debug)]
pub struct LruCache<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let i = *self.index.get(key)?;
        self.unlink(i);
        self.push_front(i);
        self.slots[i].as_ref().map(|slot| &slot.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or replaces `key`. Returns the entries evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if self.capacity == 0 {
            return Vec::new();
        }
        if let Some(&i) = self.index.get(&key) {
            if let Some(slot) = self.slots[i].as_mut() {
                slot.value = value;
            }
            self.unlink(i);
            self.push_front(i);
            return Vec::new();
        }
        let evicted = self.shrink_to(self.capacity - 1);
        let slot = Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let i = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, i);
        self.push_front(i);
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let i = self.index.remove(key)?;
        self.unlink(i);
        self.free.push(i);
        self.slots[i].take().map(|slot| slot.value)
    }

    /// Changes the capacity, evicting least recently used entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<(K, V)> {
        self.capacity = capacity;
        self.shrink_to(capacity)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let Some(slot) = self.slots[i].as_ref() else {
                break;
            };
            out.push(slot.key.clone());
            cursor = slot.next;
        }
        out
    }

    fn shrink_to(&mut self, size: usize) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        while self.len() > size {
            let Some(i) = self.tail else {
                break;
            };
            self.unlink(i);
            self.free.push(i);
            if let Some(slot) = self.slots[i].take() {
                self.index.remove(&slot.key);
                evicted.push((slot.key, slot.value));
            }
        }
        evicted
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = match self.slots[i].as_ref() {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(slot) = self.slots[p].as_mut() {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = self.slots[n].as_mut() {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(slot) = self.slots[i].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }

    fn push_front(&mut self, i: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[i].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(slot) = self.slots[h].as_mut() {
                slot.prev = Some(i);
            }
        }
        self.head = Some(i);
        if self.tail.is_none() {
            self.tail = Some(i);
        }
    }
}

/// Configuration for the triple cache
#[derive(Debug, Clone, PartialEq)]
pub struct TripleCacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for TripleCacheConfig {
    fn default() -> Self {
        TripleCacheConfig {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl TripleCacheConfig {
    pub fn from_config(config: &EngineConfig) -> Self {
        TripleCacheConfig {
            enabled: config.cache_enabled,
            max_entries: config.cache_max_entries,
        }
    }
}

pub type CachedTriples = Arc<Vec<Triple>>;

/// Thread-safe LRU cache of lookup results.
pub struct TripleCache {
    entries: Mutex<LruCache<TriplePattern, CachedTriples>>,
    enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TripleCache {
    pub fn new(config: TripleCacheConfig) -> Self {
        TripleCache {
            entries: Mutex::new(LruCache::new(config.max_entries)),
            enabled: AtomicBool::new(config.enabled),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TripleCacheConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Disabling also drops every entry.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.clear();
        }
    }

    pub fn set_capacity(&self, max_entries: usize) {
        let evicted = self.entries.lock().set_capacity(max_entries);
        self.evictions
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);
    }

    /// Returns the cached triples for `pattern`, if any.
    pub fn get(&self, pattern: &TriplePattern) -> Option<CachedTriples> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock();
        match entries.get(pattern) {
            Some(triples) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(triples.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// May trigger LRU eviction if the cache is full
    pub fn insert(&self, pattern: TriplePattern, triples: CachedTriples) {
        if !self.is_enabled() {
            return;
        }
        let evicted = self.entries.lock().insert(pattern, triples);
        if !evicted.is_empty() {
            log::debug!("TripleCache: evicted {} entries", evicted.len());
            self.evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let entries = self.entries.lock();
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: entries.len(),
            max_entries: entries.capacity(),
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate entry utilization (0.0 to 1.0)
    pub fn entry_utilization(&self) -> f64 {
        if self.max_entries == 0 {
            0.0
        } else {
            self.size as f64 / self.max_entries as f64
        }
    }
}
