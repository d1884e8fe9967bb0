//! API Module
//!
//! HTTP handlers, routing and the response cache middleware.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats` - Cache statistics
//! - `POST /cache/invalidate` - Invalidate by key or tags
//! - `DELETE /cache` - Clear the cache
//! - `POST /cache/warmup` - Run the warm-up plan
//! - `/api/...` - Cached read endpoints and the workout log endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{response_cache, CachedResponse, CACHE_STATUS_HEADER};
pub use routes::create_router;
