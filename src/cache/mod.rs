//! Cache Module
//!
//! Two-tier caching with TTL expiration, size and entry bounded LRU eviction,
//! and tag-based invalidation.

mod entry;
mod eviction;
mod facade;
pub mod keys;
mod options;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use eviction::{EvictionPolicy, MAX_ENTRY_SIZE_DIVISOR};
pub use facade::Cache;
pub use keys::Page;
pub use options::{FetchOptions, Invalidation, Priority, SetOptions};
pub use stats::CacheStats;
pub use store::{Admission, CacheStore, Lookup};
