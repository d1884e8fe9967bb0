//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be serialized for storage or deserialized into the requested type
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller-supplied fetch function failed
    #[error("Fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    /// Remote tier call failed
    #[error("Remote tier error: {0}")]
    Remote(String),

    /// Remote tier call exceeded its timeout
    #[error("Remote tier timed out after {0}ms")]
    RemoteTimeout(u64),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns the fetch error when this is a `Fetch` failure.
    pub fn as_fetch(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Fetch(err) => Some(err),
            _ => None,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::Remote(_) | CacheError::RemoteTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
