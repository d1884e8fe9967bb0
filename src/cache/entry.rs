//! Cache Entry Module
//!
//! Defines the record held by the entry store for each cached key.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cached value plus its bookkeeping.
///
/// The value is kept as its serialized JSON bytes so the store stays
/// payload-agnostic; callers pick the type when reading.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key this entry is stored under
    pub key: String,
    /// Serialized value
    pub value: Arc<[u8]>,
    /// Insertion or last refresh time (Unix milliseconds)
    pub created_at: u64,
    /// Lifetime relative to `created_at`
    pub ttl_ms: u64,
    /// Successful reads since insertion
    pub access_count: u64,
    /// Time of the last successful read or insertion (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Store-wide sequence number of the last access, breaks `last_accessed_at` ties
    pub access_seq: u64,
    /// Store-wide write number assigned on admission; a rewrite of the key gets a new one
    pub generation: u64,
    /// Labels used for bulk invalidation
    pub tags: BTreeSet<String>,
    /// Serialized size, fixed at insertion
    pub size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl_ms: u64,
        tags: impl IntoIterator<Item = String>,
    ) -> Self {
        let value = value.into();
        let now = current_timestamp_ms();
        Self {
            key: key.into(),
            size_bytes: value.len(),
            value,
            created_at: now,
            ttl_ms,
            access_count: 0,
            last_accessed_at: now,
            access_seq: 0,
            generation: 0,
            tags: tags.into_iter().collect(),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry's age exceeds its TTL at `now`.
    ///
    /// An entry is stale only once `now - created_at` is strictly greater
    /// than `ttl_ms`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }

    /// Checks whether the entry is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64, seq: u64) {
        self.access_count += 1;
        self.last_accessed_at = now;
        self.access_seq = seq;
    }

    /// Returns true if any of `tags` is attached to this entry.
    pub fn has_any_tag<'a>(&self, mut tags: impl Iterator<Item = &'a str>) -> bool {
        tags.any(|tag| self.tags.contains(tag))
    }

    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        let age = current_timestamp_ms().saturating_sub(self.created_at);
        self.ttl_ms.saturating_sub(age)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
