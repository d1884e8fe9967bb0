//! In-process remote tier.
//!
//! Behaves like a key/value server with per-key expiry. Used when no
//! networked store is configured and as the remote tier in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::remote::{pattern_matches, RemoteTier};

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: u64,
}

/// Expiry-aware in-memory implementation of [`RemoteTier`].
#[derive(Debug, Default)]
pub struct MemoryRemote {
    values: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of `key` in milliseconds, if it is stored and live.
    pub async fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let now = current_timestamp_ms();
        let values = self.values.read().await;
        values
            .get(key)
            .filter(|v| v.expires_at > now)
            .map(|v| v.expires_at - now)
    }

    /// Number of stored keys, expired or not.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl RemoteTier for MemoryRemote {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = current_timestamp_ms();
        let mut values = self.values.write().await;

        match values.get(key) {
            Some(v) if v.expires_at > now => Ok(Some(v.data.clone())),
            Some(_) => {
                values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        let expires_at = current_timestamp_ms().saturating_add(ttl_secs.saturating_mul(1000));
        self.values.write().await.insert(
            key.to_string(),
            StoredValue {
                data: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        let mut values = self.values.write().await;
        Ok(keys.iter().filter(|k| values.remove(*k).is_some()).count())
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = current_timestamp_ms();
        let values = self.values.read().await;
        Ok(values
            .iter()
            .filter(|(key, v)| v.expires_at > now && pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
