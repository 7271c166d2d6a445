//! Local Cache Store Module
//!
//! Per-handle key/value table combining HashMap storage with LRU tracking
//! and lazy TTL expiration. Every operation is infallible and in-memory.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// An entry together with its approximate footprint.
#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    size_bytes: usize,
}

// == Local Cache Store ==
/// Local replica of a subset of one remote collection.
#[derive(Debug)]
pub struct LocalCacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, Slot<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries, None = unbounded
    max_entries: Option<usize>,
    /// TTL stamped onto every inserted entry
    time_to_live: Option<Duration>,
    /// Sum of slot sizes
    size_bytes: usize,
    /// Bumped by every remove and clear, present key or not
    invalidations: u64,
}

impl<V> LocalCacheStore<V>
where
    V: Clone + Serialize,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_entries` - Optional entry bound enforced by LRU eviction
    /// * `time_to_live` - Optional TTL applied to every insert
    pub fn new(max_entries: Option<usize>, time_to_live: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            time_to_live,
            size_bytes: 0,
            invalidations: 0,
        }
    }

    // == Lookup ==
    /// Returns the live entry for a key.
    ///
    /// Expired entries are removed on the spot and reported as a miss.
    /// A hit marks the key as most recently used.
    pub fn lookup(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(slot) => slot.entry.is_expired(),
        };

        if expired {
            self.remove_slot(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries.get(key).map(|slot| slot.entry.clone())
    }

    // == Peek ==
    /// Returns the live entry for a key without touching recency or stats.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries
            .get(key)
            .map(|slot| &slot.entry)
            .filter(|entry| !entry.is_expired())
    }

    // == Insert Or Replace ==
    /// Stores a value unconditionally, resetting its TTL.
    ///
    /// When a bound is configured and a new key arrives at capacity, the
    /// least recently used entry is evicted first. Returns the evicted key.
    pub fn insert_or_replace(
        &mut self,
        key: impl Into<String>,
        value: V,
        version: Option<u64>,
    ) -> Option<String> {
        let key = key.into();
        let entry = CacheEntry::new(key.clone(), value, self.time_to_live);
        let entry = match version {
            Some(version) => entry.with_version(version),
            None => entry,
        };

        let evicted = if self.entries.contains_key(&key) {
            self.remove_slot(&key);
            None
        } else {
            self.make_room()
        };

        let size_bytes = approximate_size(&entry);
        self.size_bytes += size_bytes;
        self.entries.insert(key.clone(), Slot { entry, size_bytes });
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());

        evicted
    }

    // == Insert If Newer ==
    /// Stores a value unless the live local entry already carries a newer or
    /// equal version. Returns true if the value was stored.
    pub fn insert_if_newer(&mut self, key: impl Into<String>, value: V, version: Option<u64>) -> bool {
        let key = key.into();
        if let Some(current) = self.peek(&key) {
            if !current.is_superseded_by(version) {
                return false;
            }
        }
        self.insert_or_replace(key, value, version);
        true
    }

    // == Fill ==
    /// Current invalidation epoch. Read it before a remote round trip and
    /// hand it back to [`fill_if_current`](Self::fill_if_current).
    pub fn invalidation_epoch(&self) -> u64 {
        self.invalidations
    }

    /// Stores a value obtained from the remote store, unless any key was
    /// removed or the store was cleared since `epoch` was read.
    ///
    /// A remove for a key that is not cached yet leaves nothing behind to
    /// compare versions against, so the epoch is what keeps a fetch that
    /// started before an invalidation from re-inserting the old value.
    pub fn fill_if_current(
        &mut self,
        key: impl Into<String>,
        value: V,
        version: Option<u64>,
        epoch: u64,
    ) -> bool {
        if self.invalidations != epoch {
            return false;
        }
        self.insert_if_newer(key, value, version)
    }

    // == Remove ==
    /// Removes an entry, returning it if it was present.
    ///
    /// Always advances the invalidation epoch.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        self.invalidations += 1;
        let removed = self.remove_slot(key);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Drops every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.invalidations += 1;
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.size_bytes = 0;
        self.stats.set_total_entries(0);
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_slot(key);
        }

        self.stats.record_expirations(expired_keys.len());
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    /// Counts an entry changed by a peer event.
    pub fn record_sync_applied(&mut self) {
        self.stats.record_sync_applied();
    }

    /// Approximate bytes held by keys and JSON-encoded values.
    pub fn size_in_memory(&self) -> usize {
        self.size_bytes
    }

    /// Returns current statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of stored entries, including expired ones not yet collected.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&mut self) -> Option<String> {
        let max = self.max_entries?;
        if self.entries.len() < max {
            return None;
        }
        let evicted = self.lru.evict_oldest()?;
        if let Some(slot) = self.entries.remove(&evicted) {
            self.size_bytes -= slot.size_bytes;
        }
        self.stats.record_eviction();
        Some(evicted)
    }

    fn remove_slot(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let slot = self.entries.remove(key)?;
        self.lru.remove(key);
        self.size_bytes -= slot.size_bytes;
        Some(slot.entry)
    }
}

/// Key length plus JSON-encoded value length. Diagnostic only.
fn approximate_size<V: Serialize>(entry: &CacheEntry<V>) -> usize {
    let value_len = serde_json::to_vec(&entry.value)
        .map(|bytes| bytes.len())
        .unwrap_or(0);
    entry.key.len() + value_len
}
