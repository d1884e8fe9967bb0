//! Configuration Module
//!
//! Handles loading the cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Default maximum total size of the local tier (50 MiB)
pub const DEFAULT_MAX_SIZE_BYTES: usize = 50 * 1024 * 1024;
/// Default TTL for entries set without an explicit TTL (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
/// Default maximum number of local entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Cache core configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum sum of entry sizes held by the local tier
    pub max_size_bytes: usize,
    /// TTL in milliseconds for entries without an explicit TTL
    pub default_ttl_ms: u64,
    /// Maximum number of entries held by the local tier
    pub max_entries: usize,
    /// Whether hits and misses are counted
    pub enable_stats: bool,
    /// Prefix applied to every key written to the remote tier
    pub key_prefix: String,
    /// Upper bound for a single remote tier call, in milliseconds
    pub remote_timeout_ms: u64,
}

impl CacheConfig {
    /// Loads the cache configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE_BYTES` - Maximum total size (default: 50 MiB)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_ENTRIES` - Maximum entries (default: 1000)
    /// - `CACHE_ENABLE_STATS` - Count hits/misses (default: true)
    /// - `CACHE_KEY_PREFIX` - Remote key prefix (default: "fitcache:")
    /// - `CACHE_REMOTE_TIMEOUT_MS` - Remote call timeout (default: 250)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size_bytes: env_or("CACHE_MAX_SIZE_BYTES", defaults.max_size_bytes),
            default_ttl_ms: env_or("CACHE_DEFAULT_TTL_MS", defaults.default_ttl_ms),
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            enable_stats: env_or("CACHE_ENABLE_STATS", defaults.enable_stats),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            remote_timeout_ms: env_or("CACHE_REMOTE_TIMEOUT_MS", defaults.remote_timeout_ms),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            default_ttl_ms: DEFAULT_TTL_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
            enable_stats: true,
            key_prefix: "fitcache:".to_string(),
            remote_timeout_ms: 250,
        }
    }
}

/// Settings for the request-level cache middleware.
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// Requests whose path contains any of these substrings bypass the cache
    pub excluded_paths: Vec<String>,
    /// TTL for cached responses, in milliseconds
    pub ttl_ms: u64,
    /// Response bodies larger than this are passed through uncached
    pub max_body_bytes: usize,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            excluded_paths: vec!["/auth".to_string(), "/payments".to_string()],
            ttl_ms: 60 * 1000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache core settings
    pub cache: CacheConfig,
    /// Request cache middleware settings
    pub middleware: MiddlewareConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Redis URL for the remote tier; local-only when unset
    pub redis_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `REDIS_URL` - Remote tier location (default: unset)
    /// - `CACHE_EXCLUDED_PATHS` - Comma separated path substrings to never cache
    /// - `CACHE_API_TTL_MS` - TTL for cached API responses (default: 60000)
    ///
    /// plus everything read by [`CacheConfig::from_env`].
    pub fn from_env() -> Self {
        let defaults = MiddlewareConfig::default();
        let excluded_paths = env::var("CACHE_EXCLUDED_PATHS")
            .map(|raw| parse_list(&raw))
            .unwrap_or(defaults.excluded_paths);

        Self {
            cache: CacheConfig::from_env(),
            middleware: MiddlewareConfig {
                excluded_paths,
                ttl_ms: env_or("CACHE_API_TTL_MS", defaults.ttl_ms),
                max_body_bytes: defaults.max_body_bytes,
            },
            server_port: env_or("SERVER_PORT", 3000),
            cleanup_interval: env_or("CLEANUP_INTERVAL", 60),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            middleware: MiddlewareConfig::default(),
            server_port: 3000,
            cleanup_interval: 60,
            redis_url: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.max_entries, 1000);
        assert!(config.enable_stats);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("REDIS_URL");
        env::remove_var("CACHE_EXCLUDED_PATHS");

        let config = Config::from_env();
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.cache.default_ttl_ms, 300_000);
        assert_eq!(config.server_port, 3000);
        assert!(config.redis_url.is_none());
        assert_eq!(config.middleware.excluded_paths, vec!["/auth", "/payments"]);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" /auth, /admin ,,"), vec!["/auth", "/admin"]);
        assert!(parse_list("").is_empty());
    }
}
