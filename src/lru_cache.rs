//! # LRU Cache
//!
//! A small Least Recently Used cache. The engine keeps built
//! [`NeighbourMatcher`](crate::NeighbourMatcher)s in one, keyed by reference
//! track id, so repeated matches against the same reference skip the grid
//! build.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{OptionExt, Result};

/// LRU cache with O(n) eviction.
///
/// Capacities are small (tens of entries), so a linear scan for the oldest
/// entry is cheaper than maintaining a linked list.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, CacheEntry<V>>,
    clock: u64,
    hits: u64,
    misses: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_access: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up a value, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.hits += 1;
                entry.last_access = now;
                Some(&entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a value, evicting the least recently used entry
    /// when full.
    pub fn insert(&mut self, key: K, value: V) {
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.last_access = now;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
            },
        );
    }

    /// Cached value for `key`, building and inserting it on a miss.
    /// A failed build neither inserts nor evicts.
    pub fn get_or_try_insert_with<F>(&mut self, key: &K, build: F) -> Result<&V>
    where
        F: FnOnce() -> Result<V>,
    {
        let now = self.tick();
        if self.entries.contains_key(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let value = build()?;
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    value,
                    last_access: now,
                },
            );
        }
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_internal("cache entry missing after insert")?;
        entry.last_access = now;
        Ok(&entry.value)
    }

    /// Drop one entry.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop all entries and reset the statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.clock = 0;
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Lookups that found a value.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl<K: Eq + Hash + Clone, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(16)
    }
}
