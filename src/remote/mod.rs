//! Remote Tier Module
//!
//! The secondary, slower, larger cache layer behind the local store.
//!
//! Adapters only move bytes. Key prefixing, timeouts and error absorption
//! are the facade's job, so an adapter is free to return any error.

use async_trait::async_trait;

use crate::error::Result;

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::MemoryRemote;
#[cfg(feature = "redis")]
pub use redis_store::RedisRemote;

// == Remote Tier Trait ==
/// A networked key/value store used as the second cache tier.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Fetches the bytes stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, expiring after `ttl_secs`.
    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()>;

    /// Deletes `keys`, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Lists keys matching a glob `pattern` (`*` wildcard at either end).
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Simple glob matching with a leading or trailing `*`.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return key.starts_with(prefix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return key.ends_with(suffix);
    }

    pattern == key
}
