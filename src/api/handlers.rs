//! API Handlers
//!
//! HTTP request handlers for the cache administration endpoints and the
//! cached read endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::{keys, Cache, FetchOptions};
use crate::config::{CacheConfig, MiddlewareConfig};
use crate::error::{CacheError, Result};
use crate::invalidation;
use crate::models::{
    HealthResponse, InvalidateRequest, ListQuery, RemovedResponse, StatsResponse, MAX_PAGE_SIZE,
};
use crate::records::{
    Achievement, Exercise, NewWorkout, Routine, SystemOfRecord, Workout,
};
use crate::warmup::{WarmUpReport, POPULAR_ROUTINES_LIMIT};

/// Application state shared across all handlers.
///
/// Holds the process-wide cache and the system of record it fronts.
#[derive(Clone)]
pub struct AppState {
    /// Shared two-tier cache
    pub cache: Arc<Cache>,
    /// Primary data source
    pub records: Arc<dyn SystemOfRecord>,
    /// Response cache middleware settings
    pub middleware: Arc<MiddlewareConfig>,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(
        cache: Arc<Cache>,
        records: Arc<dyn SystemOfRecord>,
        middleware: MiddlewareConfig,
    ) -> Self {
        Self {
            cache,
            records,
            middleware: Arc::new(middleware),
        }
    }

    /// Creates a local-only AppState with default settings.
    pub fn local(config: CacheConfig, records: Arc<dyn SystemOfRecord>) -> Self {
        Self::new(
            Arc::new(Cache::new(config)),
            records,
            MiddlewareConfig::default(),
        )
    }
}

// == Cache Administration ==

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().await.into())
}

/// Handler for POST /cache/invalidate
///
/// Drops one key or every entry carrying any of the given tags.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>> {
    let target = req.into_target().map_err(CacheError::InvalidRequest)?;
    let removed = state.cache.invalidate(target).await;

    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    Json(RemovedResponse::new(state.cache.clear().await))
}

/// Handler for POST /cache/warmup
pub async fn warmup_handler(State(state): State<AppState>) -> Json<WarmUpReport> {
    Json(state.cache.warm_up(state.records.as_ref()).await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Cached Reads ==

/// Handler for GET /api/exercises
pub async fn exercises_handler(State(state): State<AppState>) -> Result<Json<Vec<Exercise>>> {
    let records = state.records.clone();
    let exercises = state
        .cache
        .get_or_fetch(
            &keys::exercise_catalog(),
            || async move { records.exercises().await },
            FetchOptions::new().tags([keys::EXERCISES]),
        )
        .await?;

    Ok(Json(exercises))
}

/// Handler for GET /api/achievements
pub async fn achievements_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Achievement>>> {
    let records = state.records.clone();
    let achievements = state
        .cache
        .get_or_fetch(
            &keys::achievement_definitions(),
            || async move { records.achievements().await },
            FetchOptions::new().tags([keys::ACHIEVEMENTS]),
        )
        .await?;

    Ok(Json(achievements))
}

/// Handler for GET /api/routines/popular
pub async fn popular_routines_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Routine>>> {
    let limit = query.limit.unwrap_or(POPULAR_ROUTINES_LIMIT).clamp(1, MAX_PAGE_SIZE);
    let records = state.records.clone();
    let routines = state
        .cache
        .get_or_fetch(
            &keys::popular_routines(limit),
            || async move { records.popular_routines(limit).await },
            FetchOptions::new()
                .tags([keys::ROUTINES])
                .force_refresh(query.refresh),
        )
        .await?;

    Ok(Json(routines))
}

/// Handler for GET /api/users/:user_id/workouts
pub async fn user_workouts_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Workout>>> {
    let page = query.page();
    let records = state.records.clone();
    let workouts = state
        .cache
        .get_or_fetch(
            &keys::user_workouts(user_id, page),
            || async move { records.user_workouts(user_id, page).await },
            FetchOptions::new()
                .tags([keys::WORKOUTS.to_string(), keys::user_tag(user_id)])
                .force_refresh(query.refresh),
        )
        .await?;

    Ok(Json(workouts))
}

// == Writes ==

/// Handler for POST /api/users/:user_id/workouts
///
/// Records the workout, then drops the caches it made stale.
pub async fn log_workout_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Json(req): Json<NewWorkout>,
) -> Result<(StatusCode, Json<Workout>)> {
    if req.name.trim().is_empty() {
        return Err(CacheError::InvalidRequest(
            "Workout name cannot be empty".to_string(),
        ));
    }

    let workout = state
        .records
        .record_workout(user_id, req)
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))?;
    invalidation::workout_logged(&state.cache, user_id).await;

    Ok((StatusCode::CREATED, Json(workout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InMemoryRecords;

    fn test_state() -> (AppState, Arc<InMemoryRecords>) {
        let records = Arc::new(InMemoryRecords::seeded());
        let state = AppState::local(CacheConfig::default(), records.clone());
        (state, records)
    }

    #[tokio::test]
    async fn test_exercises_handler_caches() {
        let (state, records) = test_state();

        let first = exercises_handler(State(state.clone())).await.unwrap();
        let second = exercises_handler(State(state.clone())).await.unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(records.queries(), 1);
    }

    #[tokio::test]
    async fn test_log_workout_invalidates_user_listing() {
        let (state, records) = test_state();

        let empty = user_workouts_handler(
            State(state.clone()),
            Path(7),
            Query(ListQuery::default()),
        )
        .await
        .unwrap();
        assert!(empty.0.is_empty());

        let (status, _) = log_workout_handler(
            State(state.clone()),
            Path(7),
            Json(NewWorkout {
                name: "Leg day".to_string(),
                duration_minutes: 45,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let listed = user_workouts_handler(State(state), Path(7), Query(ListQuery::default()))
            .await
            .unwrap();
        assert_eq!(listed.0.len(), 1);
        assert_eq!(listed.0[0].name, "Leg day");
        assert_eq!(records.queries(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_handler_rejects_empty() {
        let (state, _) = test_state();
        let req = InvalidateRequest {
            key: None,
            tags: None,
        };
        let result = invalidate_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_warmup_then_stats() {
        let (state, records) = test_state();

        let report = warmup_handler(State(state.clone())).await;
        assert!(report.0.failed.is_empty());

        exercises_handler(State(state.clone())).await.unwrap();
        assert_eq!(records.queries(), 4);

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_entries, 4);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
