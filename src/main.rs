//! fitcache - cache server for the fitness application backend
//!
//! Serves the cached read endpoints and the cache administration endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitcache::records::InMemoryRecords;
use fitcache::{create_router, spawn_cleanup_task, AppState, Cache, CacheConfig, Config};

/// Main entry point for the fitcache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache, attaching the remote tier when one is configured
/// 4. Warm the catalog queries
/// 5. Start background TTL cleanup task
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fitcache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, max_size_bytes={}, default_ttl_ms={}, port={}, cleanup_interval={}s",
        config.cache.max_entries,
        config.cache.max_size_bytes,
        config.cache.default_ttl_ms,
        config.server_port,
        config.cleanup_interval
    );

    let cache = Arc::new(build_cache(&config).await);
    let records = Arc::new(InMemoryRecords::seeded());

    let report = cache.warm_up(&*records).await;
    info!(
        "Cache warm-up finished: {} warmed, {} failed",
        report.warmed.len(),
        report.failed.len()
    );

    let cleanup_handle = spawn_cleanup_task(cache.clone(), config.cleanup_interval);
    info!("Background cleanup task started");

    let state = AppState::new(cache, records, config.middleware.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the process-wide cache.
///
/// A remote tier that cannot be reached at startup is dropped and the
/// cache runs local-only.
#[cfg(feature = "redis")]
async fn build_cache(config: &Config) -> Cache {
    use fitcache::remote::RedisRemote;

    let Some(url) = config.redis_url.as_deref() else {
        info!("No REDIS_URL set, running local-only");
        return local_cache(config.cache.clone());
    };

    match RedisRemote::connect(url).await {
        Ok(remote) => Cache::with_remote(config.cache.clone(), Arc::new(remote)),
        Err(err) => {
            warn!("Remote tier unavailable, running local-only: {}", err);
            local_cache(config.cache.clone())
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn build_cache(config: &Config) -> Cache {
    if config.redis_url.is_some() {
        warn!("REDIS_URL is set but the redis feature is disabled, running local-only");
    }
    local_cache(config.cache.clone())
}

fn local_cache(config: CacheConfig) -> Cache {
    Cache::new(config)
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
