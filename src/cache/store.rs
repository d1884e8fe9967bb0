//! Cache Store Module
//!
//! The local tier: a capacity-bounded map of entries with LRU eviction,
//! TTL checks on read and the statistics that describe it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy};

/// Result of a local lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Fresh entry found; its access bookkeeping was updated
    Hit(Arc<[u8]>),
    /// Entry was present but past its TTL and has been removed
    Expired,
    /// No entry under this key
    Missing,
}

/// Result of admitting an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Entry stored under `generation`; these keys were evicted to make room
    Stored { evicted: Vec<String>, generation: u64 },
    /// Entry larger than the per-entry limit, nothing changed
    Rejected { size_bytes: usize, limit: usize },
}

// == Cache Store ==
/// Entry store with LRU eviction and TTL support.
///
/// Not synchronized itself; the facade keeps it behind a single lock so
/// entry mutations and the statistics they produce change together.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Capacity bounds and victim selection
    policy: EvictionPolicy,
    /// Performance statistics
    stats: CacheStats,
    /// Sum of `size_bytes` over `entries`
    total_size: usize,
    /// Next access sequence number
    next_seq: u64,
    /// Whether hits and misses are counted
    count_requests: bool,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store governed by `policy`.
    pub fn new(policy: EvictionPolicy, count_requests: bool) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            stats: CacheStats::new(),
            total_size: 0,
            next_seq: 0,
            count_requests,
        }
    }

    /// The policy this store enforces.
    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    // == Admit ==
    /// Inserts an entry, evicting least recently used entries until both
    /// bounds hold with the new entry in place.
    ///
    /// An existing entry under the same key is replaced (last write wins) and
    /// does not count against the bounds while making room.
    pub fn admit(&mut self, mut entry: CacheEntry) -> Admission {
        if !self.policy.admits(entry.size_bytes) {
            self.stats.record_rejected();
            return Admission::Rejected {
                size_bytes: entry.size_bytes,
                limit: self.policy.max_entry_size(),
            };
        }

        if let Some(old) = self.entries.remove(&entry.key) {
            self.total_size -= old.size_bytes;
        }

        let mut evicted = Vec::new();
        while self
            .policy
            .must_evict(self.entries.len(), self.total_size, entry.size_bytes)
        {
            let Some(victim) = self
                .policy
                .select_victim(self.entries.values())
                .map(|victim| victim.key.clone())
            else {
                // Unreachable: an admitted entry always fits in an empty store.
                break;
            };
            if let Some(removed) = self.entries.remove(&victim) {
                self.total_size -= removed.size_bytes;
                self.stats.record_eviction();
                debug!(key = %victim, size = removed.size_bytes, "evicted least recently used entry");
            }
            evicted.push(victim);
        }

        let generation = self.bump_seq();
        entry.access_seq = generation;
        entry.generation = generation;
        self.total_size += entry.size_bytes;
        self.entries.insert(entry.key.clone(), entry);
        self.sync_occupancy();

        Admission::Stored { evicted, generation }
    }

    // == Lookup ==
    /// Looks up a fresh entry at time `now`.
    ///
    /// A hit touches the entry and counts a hit. An expired entry is removed
    /// and reported as `Expired`; misses are not counted here because the
    /// caller may still find the key in another tier.
    pub fn lookup(&mut self, key: &str, now: u64) -> Lookup {
        let expired = match self.entries.get(key) {
            None => return Lookup::Missing,
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            self.remove(key);
            return Lookup::Expired;
        }

        let seq = self.bump_seq();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now, seq);
                let value = entry.value.clone();
                self.record_hit();
                Lookup::Hit(value)
            }
            None => Lookup::Missing,
        }
    }

    // == Peek Stale ==
    /// Returns the stored value regardless of its TTL, without touching it.
    pub fn peek_stale(&self, key: &str) -> Option<Arc<[u8]>> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Returns the entry under `key`, fresh or not.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Generation ==
    /// Write generation of the entry under `key`.
    ///
    /// Changes whenever the key is rewritten and is `None` once the entry has
    /// been removed, so a background writer can tell its value was superseded.
    pub fn generation(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.generation)
    }

    // == Remove ==
    /// Unconditionally removes an entry. Returns true if one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_size -= entry.size_bytes;
                self.sync_occupancy();
                true
            }
            None => false,
        }
    }

    // == Remove Tagged ==
    /// Removes every entry carrying at least one of `tags`, returning their keys.
    pub fn remove_tagged(&mut self, tags: &[String]) -> Vec<String> {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.has_any_tag(tags.iter().map(String::as_str)))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &keys {
            if let Some(entry) = self.entries.remove(key) {
                self.total_size -= entry.size_bytes;
            }
        }

        self.sync_occupancy();
        keys
    }

    // == Clear ==
    /// Drops every entry. Cumulative counters are kept.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.total_size = 0;
        self.sync_occupancy();
        count
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            if let Some(entry) = self.entries.remove(key) {
                self.total_size -= entry.size_bytes;
            }
        }

        self.sync_occupancy();
        expired_keys.len()
    }

    // == Request Counters ==
    pub fn record_hit(&mut self) {
        if self.count_requests {
            self.stats.record_hit();
        }
    }

    pub fn record_miss(&mut self) {
        if self.count_requests {
            self.stats.record_miss();
        }
    }

    pub fn record_remote_hit(&mut self) {
        if self.count_requests {
            self.stats.record_hit();
            self.stats.record_remote_hit();
        }
    }

    pub fn record_remote_error(&mut self) {
        self.stats.record_remote_error();
    }

    pub fn record_stale_served(&mut self) {
        self.stats.record_stale_served();
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current sum of entry sizes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn sync_occupancy(&mut self) {
        self.stats.set_occupancy(self.entries.len(), self.total_size);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::current_timestamp_ms;

    fn store(max_entries: usize, max_size: usize) -> CacheStore {
        CacheStore::new(EvictionPolicy::new(max_entries, max_size), true)
    }

    fn entry(key: &str, value: &str, tags: &[&str]) -> CacheEntry {
        CacheEntry::new(
            key,
            value.as_bytes().to_vec(),
            60_000,
            tags.iter().map(|t| t.to_string()),
        )
    }

    fn evicted(admission: Admission) -> Vec<String> {
        match admission {
            Admission::Stored { evicted, .. } => evicted,
            other => panic!("expected stored, got {:?}", other),
        }
    }

    fn is_hit(store: &mut CacheStore, key: &str) -> bool {
        matches!(store.lookup(key, current_timestamp_ms()), Lookup::Hit(_))
    }

    #[test]
    fn test_store_new() {
        let store = store(100, 10_000);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_admit_and_lookup() {
        let mut store = store(100, 10_000);

        let admission = store.admit(entry("key1", "value1", &[]));
        assert!(evicted(admission).is_empty());

        match store.lookup("key1", current_timestamp_ms()) {
            Lookup::Hit(value) => assert_eq!(&*value, b"value1"),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 6);
        assert_eq!(store.entry("key1").unwrap().access_count, 1);
    }

    #[test]
    fn test_store_lookup_missing() {
        let mut store = store(100, 10_000);
        assert_eq!(store.lookup("nonexistent", current_timestamp_ms()), Lookup::Missing);
    }

    #[test]
    fn test_store_lookup_expired_removes_entry() {
        let mut store = store(100, 10_000);
        let mut stale = entry("key1", "value1", &[]);
        stale.ttl_ms = 10;
        let created = stale.created_at;
        store.admit(stale);

        assert_eq!(store.lookup("key1", created + 11), Lookup::Expired);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_overwrite_replaces_size() {
        let mut store = store(100, 10_000);

        store.admit(entry("key1", "value1", &[]));
        store.admit(entry("key1", "v2", &[]));

        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 2);
        assert_eq!(store.peek_stale("key1").as_deref(), Some(&b"v2"[..]));
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let mut store = store(2, 10_000);

        store.admit(entry("a", "1", &[]));
        store.admit(entry("b", "1", &[]));
        let admission = store.admit(entry("a", "2", &[]));

        assert!(evicted(admission).is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = store(3, 10_000);

        store.admit(entry("key1", "value1", &[]));
        store.admit(entry("key2", "value2", &[]));
        store.admit(entry("key3", "value3", &[]));

        // Cache is full, adding key4 should evict key1 (oldest)
        let admission = store.admit(entry("key4", "value4", &[]));

        assert_eq!(evicted(admission), vec!["key1".to_string()]);
        assert_eq!(store.len(), 3);
        assert!(!is_hit(&mut store, "key1"));
        assert!(is_hit(&mut store, "key2"));
        assert!(is_hit(&mut store, "key3"));
        assert!(is_hit(&mut store, "key4"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_lookup() {
        let mut store = store(3, 10_000);

        store.admit(entry("key1", "value1", &[]));
        store.admit(entry("key2", "value2", &[]));
        store.admit(entry("key3", "value3", &[]));

        // Access key1 to make it most recently used
        assert!(is_hit(&mut store, "key1"));

        // Adding key4 should evict key2 (now oldest)
        store.admit(entry("key4", "value4", &[]));

        assert!(is_hit(&mut store, "key1"));
        assert!(!is_hit(&mut store, "key2"));
    }

    #[test]
    fn test_store_size_bound_evicts_until_fit() {
        // 100 byte budget, 10 byte entries
        let mut store = store(100, 100);
        for i in 0..10 {
            store.admit(entry(&format!("k{}", i), "0123456789", &[]));
        }
        assert_eq!(store.total_size(), 100);

        let admission = store.admit(entry("big", "0123456789", &[]));
        assert_eq!(evicted(admission), vec!["k0".to_string()]);
        assert!(store.total_size() <= 100);
    }

    #[test]
    fn test_store_rejects_oversized() {
        let mut store = store(100, 100);
        let admission = store.admit(entry("big", "01234567890", &[]));

        assert_eq!(admission, Admission::Rejected { size_bytes: 11, limit: 10 });
        assert!(store.is_empty());
        assert_eq!(store.stats().rejected_oversized, 1);
    }

    #[test]
    fn test_store_generation_moves_on_rewrite_and_removal() {
        let mut store = store(100, 10_000);

        let first = match store.admit(entry("w1", "v1", &["u:1"])) {
            Admission::Stored { generation, .. } => generation,
            other => panic!("expected stored, got {:?}", other),
        };
        assert_eq!(store.generation("w1"), Some(first));

        // Reads do not change the generation
        assert!(is_hit(&mut store, "w1"));
        assert_eq!(store.generation("w1"), Some(first));

        store.admit(entry("w1", "v2", &["u:1"]));
        let second = store.generation("w1").unwrap();
        assert!(second > first);

        store.remove_tagged(&["u:1".to_string()]);
        assert_eq!(store.generation("w1"), None);

        store.admit(entry("w1", "v3", &[]));
        assert!(store.remove("w1"));
        assert_eq!(store.generation("w1"), None);

        store.admit(entry("w1", "v4", &[]));
        store.clear();
        assert_eq!(store.generation("w1"), None);
    }

    #[test]
    fn test_store_remove() {
        let mut store = store(100, 10_000);

        store.admit(entry("key1", "value1", &[]));
        assert!(store.remove("key1"));
        assert!(!store.remove("key1"));

        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_remove_tagged() {
        let mut store = store(100, 10_000);

        store.admit(entry("w1", "1", &["workouts", "u:1"]));
        store.admit(entry("w2", "2", &["workouts", "u:2"]));
        store.admit(entry("p1", "3", &["profile", "u:1"]));
        store.admit(entry("ex", "4", &["exercises"]));

        let mut removed = store.remove_tagged(&["u:1".to_string()]);
        removed.sort();

        assert_eq!(removed, vec!["p1".to_string(), "w1".to_string()]);
        assert_eq!(store.len(), 2);
        assert!(store.entry("w2").is_some());
        assert!(store.entry("ex").is_some());
        assert_eq!(store.stats().total_entries, 2);
    }

    #[test]
    fn test_store_clear_keeps_counters() {
        let mut store = store(1, 10_000);

        store.admit(entry("a", "1", &[]));
        store.admit(entry("b", "1", &[]));
        assert!(is_hit(&mut store, "b"));
        store.record_miss();

        assert_eq!(store.clear(), 1);

        let stats = store.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size_bytes, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_store_stats_disabled() {
        let mut store = CacheStore::new(EvictionPolicy::new(10, 10_000), false);

        store.admit(entry("a", "1", &[]));
        assert!(is_hit(&mut store, "a"));
        store.record_miss();

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_purge_expired() {
        let mut store = store(100, 10_000);

        let mut short = entry("key1", "value1", &[]);
        short.ttl_ms = 10;
        let created = short.created_at;
        store.admit(short);
        store.admit(entry("key2", "value2", &[]));

        let removed = store.purge_expired(created + 1_000);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.entry("key2").is_some());
    }

    #[test]
    fn test_store_peek_stale_ignores_ttl() {
        let mut store = store(100, 10_000);
        let mut short = entry("key1", "value1", &[]);
        short.ttl_ms = 0;
        short.created_at = 0;
        store.admit(short);

        assert_eq!(store.peek_stale("key1").as_deref(), Some(&b"value1"[..]));
        assert_eq!(store.entry("key1").unwrap().access_count, 0);
    }
}
