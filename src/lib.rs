//! fitcache - A multi-tier cache for a fitness application backend
//!
//! Local TTL + LRU store with tag invalidation, an optional remote tier,
//! a key scheme, a response cache middleware and a warm-up plan.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod records;
pub mod remote;
pub mod tasks;
pub mod warmup;

pub use api::{create_router, AppState};
pub use cache::{Cache, CacheStats, FetchOptions, Invalidation, Priority, SetOptions};
pub use config::{CacheConfig, Config, MiddlewareConfig};
pub use error::{CacheError, Result};
pub use remote::RemoteTier;
pub use tasks::spawn_cleanup_task;
