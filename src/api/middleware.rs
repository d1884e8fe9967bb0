//! Response Cache Middleware
//!
//! Caches successful GET responses by path and normalized query string.
//! Other methods, excluded paths, non-200 responses and bodies that are not
//! known to fit within `max_body_bytes` pass straight through.

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::cache::{keys, SetOptions};

/// Header reporting whether a response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Stored form of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub content_type: Option<String>,
    pub body: String,
}

impl CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        if let Some(content_type) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        mark(response, "HIT")
    }
}

/// Middleware entry point, installed with `axum::middleware::from_fn_with_state`.
pub async fn response_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if request.method() != Method::GET || is_excluded(&path, &state.middleware.excluded_paths) {
        return next.run(request).await;
    }

    let key = keys::request(&path, request.uri().query());
    match state.cache.get::<CachedResponse>(&key).await {
        Ok(Some(cached)) => return cached.into_response(),
        Ok(None) => {}
        Err(err) => warn!(key = %key, error = %err, "unreadable cached response"),
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return mark(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let limit = state.middleware.max_body_bytes;
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= u64::try_from(limit).unwrap_or(u64::MAX));
    if !fits {
        debug!(path = %path, limit, "response body too large to cache, passing through");
        return mark(Response::from_parts(parts, body), "MISS");
    }

    // Bounded by the size hint; only the handler's own body can fail here
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path = %path, error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(body) = std::str::from_utf8(&bytes) {
        let cached = CachedResponse {
            content_type: parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body: body.to_string(),
        };
        let options = SetOptions::new()
            .ttl(Duration::from_millis(state.middleware.ttl_ms))
            .tags(response_tags(&path));
        if let Err(err) = state.cache.set(&key, &cached, options).await {
            warn!(key = %key, error = %err, "failed to cache response");
        }
    }

    mark(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// True if `path` contains any excluded substring.
pub fn is_excluded(path: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// `api`, the resource family, and the user tag for user-scoped paths.
///
/// `/api/users/7/workouts` yields `["api", "workouts", "u:7"]`,
/// `/api/exercises` yields `["api", "exercises"]`.
pub fn response_tags(path: &str) -> Vec<String> {
    let mut tags = vec![keys::API_TAG.to_string()];
    let mut segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .skip_while(|s| *s == "api");

    match segments.next() {
        Some("users") => {
            if let Some(user_id) = segments.next() {
                if let Some(family) = segments.next() {
                    tags.push(family.to_string());
                }
                tags.push(keys::user_tag(user_id));
            }
        }
        Some(family) => tags.push(family.to_string()),
        None => {}
    }
    tags
}

fn mark(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tags() {
        assert_eq!(response_tags("/api/exercises"), vec!["api", "exercises"]);
        assert_eq!(
            response_tags("/api/users/7/workouts"),
            vec!["api", "workouts", "u:7"]
        );
        assert_eq!(response_tags("/api/users/7"), vec!["api", "u:7"]);
        assert_eq!(response_tags("/"), vec!["api"]);
    }

    #[test]
    fn test_is_excluded() {
        let excluded = vec!["/auth".to_string(), "/payments".to_string()];
        assert!(is_excluded("/api/payments/webhook", &excluded));
        assert!(is_excluded("/auth/login", &excluded));
        assert!(!is_excluded("/api/exercises", &excluded));
        assert!(!is_excluded("/api/exercises", &[]));
    }
}
