//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming request bodies and query strings.

use serde::Deserialize;

use crate::cache::{Invalidation, Page};

/// Request body for POST /cache/invalidate
///
/// Exactly one of `key` or `tags` must be given.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Exact key to drop
    #[serde(default)]
    pub key: Option<String>,
    /// Drop every entry carrying any of these tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl InvalidateRequest {
    /// Converts the request into an invalidation target.
    ///
    /// Returns an error message if validation fails.
    pub fn into_target(self) -> Result<Invalidation, String> {
        match (self.key, self.tags) {
            (Some(key), None) if !key.is_empty() => Ok(Invalidation::Key(key)),
            (Some(_), None) => Err("Key cannot be empty".to_string()),
            (None, Some(tags)) if !tags.is_empty() => Ok(Invalidation::Tags(tags)),
            (None, Some(_)) => Err("Tags cannot be empty".to_string()),
            (Some(_), Some(_)) => Err("Provide either key or tags, not both".to_string()),
            (None, None) => Err("Provide a key or tags".to_string()),
        }
    }
}

/// Query string for paginated listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    /// Bypass cached data and reload from the database
    #[serde(default)]
    pub refresh: bool,
}

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

impl ListQuery {
    /// Page window with defaults applied and the limit clamped.
    pub fn page(&self) -> Page {
        let defaults = Page::default();
        Page::new(
            self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            self.offset.unwrap_or(defaults.offset),
        )
    }
}
