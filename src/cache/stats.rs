//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
///
/// Counters are cumulative for the life of the cache and survive `clear`;
/// `total_entries` and `total_size_bytes` always describe the current contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Successful reads from either tier
    pub hits: u64,
    /// Reads that missed both tiers
    pub misses: u64,
    /// Entries removed to satisfy the capacity bounds
    pub evictions: u64,
    /// Hits served by the remote tier after a local miss
    pub remote_hits: u64,
    /// Remote tier calls that failed or timed out
    pub remote_errors: u64,
    /// `set` calls refused because the value was too large
    pub rejected_oversized: u64,
    /// Stale values served after a failed forced refresh
    pub stale_served: u64,
    /// Current number of live entries
    pub total_entries: usize,
    /// Current sum of entry sizes
    pub total_size_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_remote_hit(&mut self) {
        self.remote_hits += 1;
    }

    pub fn record_remote_error(&mut self) {
        self.remote_errors += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected_oversized += 1;
    }

    pub fn record_stale_served(&mut self) {
        self.stale_served += 1;
    }

    // == Update Occupancy ==
    /// Updates the current entry count and total size.
    pub fn set_occupancy(&mut self, entries: usize, size_bytes: usize) {
        self.total_entries = entries;
        self.total_size_bytes = size_bytes;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size_bytes, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_record_counters() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        stats.record_remote_hit();
        stats.record_remote_error();
        stats.record_rejected();
        stats.record_stale_served();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.remote_hits, 1);
        assert_eq!(stats.remote_errors, 1);
        assert_eq!(stats.rejected_oversized, 1);
        assert_eq!(stats.stale_served, 1);
    }

    #[test]
    fn test_set_occupancy() {
        let mut stats = CacheStats::new();
        stats.set_occupancy(42, 4_096);
        assert_eq!(stats.total_entries, 42);
        assert_eq!(stats.total_size_bytes, 4_096);
    }
}
