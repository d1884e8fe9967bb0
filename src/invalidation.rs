//! Invalidation Recipes
//!
//! Named invalidations for mutation-side code to call after a successful
//! write. The cache never discovers writes by itself.

use tracing::info;

use crate::cache::{keys, Cache};

/// Drops everything cached on behalf of `user_id`.
pub async fn invalidate_user(cache: &Cache, user_id: u64) -> usize {
    let removed = cache.invalidate(vec![keys::user_tag(user_id)]).await;
    info!(user_id, removed, "invalidated user cache");
    removed
}

/// Drops everything tagged with a resource family, e.g. [`keys::EXERCISES`].
pub async fn invalidate_family(cache: &Cache, family: &str) -> usize {
    let removed = cache.invalidate(vec![family.to_string()]).await;
    info!(family, removed, "invalidated resource family");
    removed
}

/// After a user logs a workout: their workout listings, their feed and
/// the shared popularity rankings are stale.
pub async fn workout_logged(cache: &Cache, user_id: u64) -> usize {
    let tags = vec![keys::user_tag(user_id), keys::ROUTINES.to_string()];
    let removed = cache.invalidate(tags).await;
    info!(user_id, removed, "invalidated after workout logged");
    removed
}

/// Drops every cached HTTP response.
pub async fn invalidate_api_responses(cache: &Cache) -> usize {
    cache.invalidate(vec![keys::API_TAG.to_string()]).await
}
