//! Cache Facade Module
//!
//! Public entry point coordinating the local store and the optional remote tier.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::cache::{
    current_timestamp_ms, Admission, CacheEntry, CacheStats, CacheStore, EvictionPolicy,
    FetchOptions, Invalidation, Lookup, Priority, SetOptions,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::remote::RemoteTier;

/// Number of lock stripes ordering remote writes against remote deletes.
const REMOTE_WRITE_STRIPES: usize = 64;

// == Cache ==
/// Two-tier cache: a bounded in-process store in front of an optional remote tier.
///
/// The local tier is authoritative. Remote failures and timeouts are logged,
/// counted in [`CacheStats::remote_errors`] and otherwise treated as misses.
///
/// Construct one per process and share it behind an `Arc`.
pub struct Cache {
    store: Arc<Mutex<CacheStore>>,
    remote: Option<Arc<dyn RemoteTier>>,
    /// Held by a background remote write for its key's stripe, and by
    /// invalidation and clear around their remote deletes
    write_stripes: Arc<[Mutex<()>]>,
    config: CacheConfig,
}

impl Cache {
    // == Constructors ==
    /// Creates a local-only cache.
    pub fn new(config: CacheConfig) -> Self {
        let policy = EvictionPolicy::new(config.max_entries, config.max_size_bytes);
        Self {
            store: Arc::new(Mutex::new(CacheStore::new(policy, config.enable_stats))),
            remote: None,
            write_stripes: (0..REMOTE_WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
            config,
        }
    }

    /// Creates a cache backed by `remote` as its second tier.
    pub fn with_remote(config: CacheConfig, remote: Arc<dyn RemoteTier>) -> Self {
        Self {
            remote: Some(remote),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Values larger than a tenth of the size budget are logged and dropped.
    /// Unless the priority is [`Priority::Low`], the value is also written to
    /// the remote tier in the background with twice the local TTL.
    ///
    /// Fails only if `value` cannot be serialized.
    pub async fn set<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes: Arc<[u8]> = serde_json::to_vec(value)?.into();
        let ttl_ms = options
            .ttl
            .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(self.config.default_ttl_ms);

        let Some(generation) = self.admit(key, bytes.clone(), ttl_ms, options.tags).await else {
            return Ok(());
        };

        if options.priority != Priority::Low {
            self.mirror(key, bytes, ttl_ms, generation);
        }
        Ok(())
    }

    // == Get ==
    /// Reads `key`, trying the local tier then the remote tier.
    ///
    /// A remote hit is copied back into the local tier with the default TTL.
    /// Returns `Ok(None)` when both tiers miss, and an error only when the
    /// stored value does not deserialize into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_bytes(key).await {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// With `force_refresh` the cached value is skipped. If `fetch` then
    /// fails, any value still held for `key` is served instead, even past its
    /// TTL. Otherwise fetch errors are returned as [`CacheError::Fetch`].
    ///
    /// Concurrent callers missing on the same key each run their own fetch.
    pub async fn get_or_fetch<T, F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        options: FetchOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        if !options.force_refresh {
            if let Some(value) = self.get(key).await? {
                return Ok(value);
            }
        }

        match fetch().await {
            Ok(value) => {
                self.set(key, &value, options.to_set_options()).await?;
                Ok(value)
            }
            Err(err) => {
                let err = err.into();
                if options.force_refresh {
                    if let Some(stale) = self.stale::<T>(key).await {
                        warn!(key = %key, error = %err, "refresh failed, serving stale data");
                        self.store.lock().await.record_stale_served();
                        return Ok(stale);
                    }
                }
                Err(CacheError::Fetch(err))
            }
        }
    }

    // == Invalidate ==
    /// Removes one key, or every entry carrying any of the given tags, from both tiers.
    ///
    /// Returns the number of entries removed (0 or 1 for a single key).
    pub async fn invalidate(&self, target: impl Into<Invalidation>) -> usize {
        match target.into() {
            Invalidation::Key(key) => {
                let local = self.store.lock().await.remove(&key);
                let remote = self.remote_delete(vec![key.clone()]).await;
                debug!(key = %key, local, remote, "invalidated key");
                usize::from(local || remote > 0)
            }
            Invalidation::Tags(tags) => {
                if tags.is_empty() {
                    return 0;
                }
                let removed = self.store.lock().await.remove_tagged(&tags);
                if !removed.is_empty() {
                    self.remote_delete(removed.clone()).await;
                }
                debug!(tags = ?tags, count = removed.len(), "invalidated tags");
                removed.len()
            }
        }
    }

    // == Clear ==
    /// Empties the local tier and deletes this cache's keys from the remote tier.
    ///
    /// Cumulative counters in [`CacheStats`] survive; size and count reset.
    pub async fn clear(&self) -> usize {
        let removed = self.store.lock().await.clear();

        if let Some(remote) = &self.remote {
            let _guards = self.lock_stripes(0..self.write_stripes.len()).await;
            let pattern = format!("{}*", self.config.key_prefix);
            if let Some(keys) = self.remote_call("list", remote.list_keys(&pattern)).await {
                if !keys.is_empty() {
                    self.remote_call("delete", remote.delete(&keys)).await;
                }
            }
        }

        info!(removed, "cache cleared");
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    /// Removes expired entries from the local tier.
    pub async fn purge_expired(&self) -> usize {
        self.store.lock().await.purge_expired(current_timestamp_ms())
    }

    /// Number of live local entries.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    // == Internals ==
    /// Admits an entry into the local tier, returning its write generation.
    /// `None` if it was rejected as oversized.
    async fn admit(&self, key: &str, bytes: Arc<[u8]>, ttl_ms: u64, tags: Vec<String>) -> Option<u64> {
        let entry = CacheEntry::new(key, bytes, ttl_ms, tags);
        let admission = self.store.lock().await.admit(entry);

        match admission {
            Admission::Stored { evicted, generation } => {
                if !evicted.is_empty() {
                    debug!(key = %key, evicted = evicted.len(), "made room for entry");
                }
                Some(generation)
            }
            Admission::Rejected { size_bytes, limit } => {
                warn!(key = %key, size_bytes, limit, "value too large to cache, skipping");
                None
            }
        }
    }

    async fn get_bytes(&self, key: &str) -> Option<Arc<[u8]>> {
        if let Lookup::Hit(bytes) = self.store.lock().await.lookup(key, current_timestamp_ms()) {
            debug!(key = %key, "local hit");
            return Some(bytes);
        }

        if let Some(bytes) = self.remote_get(key).await {
            let bytes: Arc<[u8]> = bytes.into();
            let mut store = self.store.lock().await;
            // A local write that landed while the remote read was in flight is newer
            if store.entry(key).is_none() {
                let entry = CacheEntry::new(key, bytes.clone(), self.config.default_ttl_ms, Vec::new());
                if let Admission::Rejected { size_bytes, .. } = store.admit(entry) {
                    warn!(key = %key, size_bytes, "remote value too large for local tier");
                }
            }
            store.record_remote_hit();
            debug!(key = %key, "remote hit");
            return Some(bytes);
        }

        self.store.lock().await.record_miss();
        debug!(key = %key, "miss");
        None
    }

    /// Whatever is still held for `key`, ignoring TTL.
    async fn stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let local = self.store.lock().await.peek_stale(key);
        let bytes = match local {
            Some(bytes) => bytes.to_vec(),
            None => self.remote_get(key).await?,
        };
        serde_json::from_slice(&bytes).ok()
    }

    fn remote_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.config.remote_timeout_ms)
    }

    async fn remote_get(&self, key: &str) -> Option<Vec<u8>> {
        let remote = self.remote.as_ref()?;
        let remote_key = self.remote_key(key);
        self.remote_call("get", remote.get(&remote_key)).await.flatten()
    }

    /// Deletes `keys` from the remote tier once no background write for
    /// them is in flight.
    async fn remote_delete(&self, keys: Vec<String>) -> usize {
        let Some(remote) = &self.remote else {
            return 0;
        };
        let stripes: BTreeSet<usize> = keys.iter().map(|key| stripe_of(key)).collect();
        let _guards = self.lock_stripes(stripes).await;

        let keys: Vec<String> = keys.iter().map(|key| self.remote_key(key)).collect();
        self.remote_call("delete", remote.delete(&keys))
            .await
            .unwrap_or(0)
    }

    /// Locks the given stripes in ascending order.
    async fn lock_stripes(&self, stripes: impl IntoIterator<Item = usize>) -> Vec<MutexGuard<'_, ()>> {
        let mut guards = Vec::new();
        for stripe in stripes {
            if let Some(lock) = self.write_stripes.get(stripe) {
                guards.push(lock.lock().await);
            }
        }
        guards
    }

    /// Runs a remote call under the remote timeout. Failures become `None`.
    async fn remote_call<T, F>(&self, op: &'static str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let outcome = run_remote(self.remote_timeout(), call).await;
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(op, error = %err, "remote tier unavailable");
                self.store.lock().await.record_remote_error();
                None
            }
        }
    }

    /// Writes to the remote tier in the background.
    ///
    /// The write holds its key's stripe and is skipped when the local entry
    /// no longer carries `generation`, so a later `set`, `invalidate` or
    /// `clear` is never undone by an earlier write landing late.
    fn mirror(&self, key: &str, bytes: Arc<[u8]>, ttl_ms: u64, generation: u64) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let stripes = Arc::clone(&self.write_stripes);
        let stripe = stripe_of(key);
        let key = key.to_string();
        let remote_key = self.remote_key(&key);
        let timeout = self.remote_timeout();
        let ttl_secs = ttl_ms.saturating_mul(2).div_ceil(1000);

        tokio::spawn(async move {
            let Some(lock) = stripes.get(stripe) else {
                return;
            };
            let _guard = lock.lock().await;

            if store.lock().await.generation(&key) != Some(generation) {
                debug!(key = %remote_key, "superseded before remote write, skipping");
                return;
            }

            let call = remote.set_with_expiry(&remote_key, &bytes, ttl_secs);
            if let Err(err) = run_remote(timeout, call).await {
                warn!(key = %remote_key, error = %err, "remote write failed");
                store.lock().await.record_remote_error();
            }
        });
    }
}

fn stripe_of(key: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % REMOTE_WRITE_STRIPES as u64) as usize
}

async fn run_remote<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::RemoteTimeout(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
