//! Redis-backed remote tier.
//!
//! Requires the `redis` feature to be enabled.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::info;

use crate::error::{CacheError, Result};
use crate::remote::RemoteTier;

/// Remote tier over a multiplexed Redis connection.
///
/// Values are written with `SETEX`, listed with `KEYS` and removed with `DEL`.
pub struct RedisRemote {
    conn: MultiplexedConnection,
}

impl RedisRemote {
    /// Connects to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Remote(format!("Redis client error: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Remote(format!("Redis connection error: {}", e)))?;

        info!("Connected to Redis remote tier");
        Ok(Self { conn })
    }
}

#[async_trait]
impl RemoteTier for RedisRemote {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Remote(format!("Redis GET error: {}", e)))
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1))
            .await
            .map_err(|e| CacheError::Remote(format!("Redis SETEX error: {}", e)))
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let deleted: i64 = conn
            .del(keys.to_vec())
            .await
            .map_err(|e| CacheError::Remote(format!("Redis DEL error: {}", e)))?;

        Ok(deleted.max(0) as usize)
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.keys(pattern)
            .await
            .map_err(|e| CacheError::Remote(format!("Redis KEYS error: {}", e)))
    }
}
