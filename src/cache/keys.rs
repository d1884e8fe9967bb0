//! Key Scheme Module
//!
//! Deterministic cache key builders. Every key starts with its resource
//! family, identifiers are escaped so they cannot forge a `:` boundary, and
//! filter sets are hashed after normalization so equivalent filters map to
//! the same bounded-length key regardless of field order.

use std::fmt::Display;

use sha2::{Digest, Sha256};

// == Resource Families ==
pub const WORKOUTS: &str = "workouts";
pub const EXERCISES: &str = "exercises";
pub const ACHIEVEMENTS: &str = "achievements";
pub const ROUTINES: &str = "routines";
pub const FEED: &str = "feed";
pub const PLANS: &str = "plans";

/// Tag carried by every cached HTTP response.
pub const API_TAG: &str = "api";

/// Paths longer than this are hashed instead of embedded.
const MAX_PATH_SEGMENT: usize = 128;

/// Pagination window of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

// == Tags ==
/// Tag attached to everything cached on behalf of one user.
pub fn user_tag(user_id: impl Display) -> String {
    format!("u:{}", escape(&user_id.to_string()))
}

// == Keys ==
/// `u:{id}:workouts:{limit}:{offset}`
pub fn user_workouts(user_id: impl Display, page: Page) -> String {
    format!(
        "{}:{}:{}:{}",
        user_tag(user_id),
        WORKOUTS,
        page.limit,
        page.offset
    )
}

/// `u:{id}:feed:{limit}:{offset}`
pub fn user_feed(user_id: impl Display, page: Page) -> String {
    format!("{}:{}:{}:{}", user_tag(user_id), FEED, page.limit, page.offset)
}

/// Filtered, paginated listing of a resource family within a scope
/// (for example `"public"` or a user tag).
///
/// `{family}:{scope}:{filters}:{limit}:{offset}` where `{filters}` is
/// `all` or a 16 hex digit digest of the normalized filter set.
pub fn listing<I, K, V>(family: &str, scope: &str, filters: I, page: Page) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    format!(
        "{}:{}:{}:{}:{}",
        escape(family),
        escape(scope),
        filters_digest(filters),
        page.limit,
        page.offset
    )
}

/// Key for a cached HTTP response: `api:{path}:{query digest}`.
///
/// `query` is the raw query string; parameter order does not matter.
pub fn request(path: &str, query: Option<&str>) -> String {
    let path = if path.len() > MAX_PATH_SEGMENT {
        format!("h{}", short_digest(path.as_bytes()))
    } else {
        escape(path)
    };
    let pairs = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")));

    format!("{}:{}:{}", API_TAG, path, filters_digest(pairs))
}

pub fn exercise_catalog() -> String {
    format!("{}:catalog", EXERCISES)
}

pub fn achievement_definitions() -> String {
    format!("{}:definitions", ACHIEVEMENTS)
}

pub fn popular_routines(limit: u32) -> String {
    format!("{}:popular:{}", ROUTINES, limit)
}

pub fn subscription_plans() -> String {
    format!("{}:all", PLANS)
}

// == Helpers ==
/// Digest of a filter set: fields and values trimmed, empty fields dropped,
/// sorted by field then value.
pub fn filters_digest<I, K, V>(filters: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = filters
        .into_iter()
        .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect();

    if pairs.is_empty() {
        return "all".to_string();
    }

    pairs.sort();
    let mut hasher = Sha256::new();
    for (k, v) in &pairs {
        // Length-prefixed so "a=b" + "c" never equals "a" + "b=c"
        hasher.update((k.len() as u64).to_be_bytes());
        hasher.update(k.as_bytes());
        hasher.update((v.len() as u64).to_be_bytes());
        hasher.update(v.as_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
}

fn short_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(&hasher.finalize()[..8])
}

/// Escapes `%` and `:` so a caller-provided segment stays one segment.
fn escape(segment: &str) -> String {
    if !segment.contains([':', '%']) {
        return segment.to_string();
    }
    segment.replace('%', "%25").replace(':', "%3A")
}
