//! Eviction Policy Module
//!
//! Capacity bounds and least-recently-used victim selection for the entry store.

use crate::cache::CacheEntry;

/// An entry may use at most `max_size_bytes / MAX_ENTRY_SIZE_DIVISOR` bytes.
pub const MAX_ENTRY_SIZE_DIVISOR: usize = 10;

// == Eviction Policy ==
/// Decides when the store is over capacity and which entry goes first.
///
/// Victims are chosen by scanning all live entries for the smallest
/// `(last_accessed_at, access_seq)`. The scan is O(n), bounded by `max_entries`.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_entries: usize,
    max_size_bytes: usize,
}

impl EvictionPolicy {
    // == Constructor ==
    /// Creates a policy. A store always holds room for at least one entry.
    pub fn new(max_entries: usize, max_size_bytes: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_size_bytes,
        }
    }

    /// Maximum number of live entries.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Maximum sum of entry sizes.
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    // == Admission ==
    /// Largest single entry the store accepts.
    pub fn max_entry_size(&self) -> usize {
        self.max_size_bytes / MAX_ENTRY_SIZE_DIVISOR
    }

    /// Returns true if an entry of `size_bytes` may be stored at all.
    pub fn admits(&self, size_bytes: usize) -> bool {
        size_bytes <= self.max_entry_size()
    }

    // == Capacity Check ==
    /// Returns true if inserting `incoming_bytes` on top of the current
    /// contents would break either bound.
    pub fn must_evict(&self, entry_count: usize, total_size: usize, incoming_bytes: usize) -> bool {
        entry_count + 1 > self.max_entries || total_size + incoming_bytes > self.max_size_bytes
    }

    // == Victim Selection ==
    /// Picks the least recently accessed entry, if any.
    pub fn select_victim<'a, I>(&self, entries: I) -> Option<&'a CacheEntry>
    where
        I: IntoIterator<Item = &'a CacheEntry>,
    {
        entries
            .into_iter()
            .min_by_key(|entry| (entry.last_accessed_at, entry.access_seq))
    }
}
