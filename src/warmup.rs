//! Cache Warm-Up
//!
//! Preloads the read-heavy catalog queries at startup so the first requests
//! after a deploy do not all fall through to the database.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{keys, Cache, SetOptions};
use crate::error::{CacheError, Result};
use crate::records::SystemOfRecord;

/// Number of routines preloaded by [`WarmUpQuery::PopularRoutines`].
pub const POPULAR_ROUTINES_LIMIT: u32 = 10;

/// The fixed set of queries loaded by [`Cache::warm_up`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmUpQuery {
    ExerciseCatalog,
    AchievementDefinitions,
    PopularRoutines,
    SubscriptionPlans,
}

impl WarmUpQuery {
    pub const ALL: [WarmUpQuery; 4] = [
        WarmUpQuery::ExerciseCatalog,
        WarmUpQuery::AchievementDefinitions,
        WarmUpQuery::PopularRoutines,
        WarmUpQuery::SubscriptionPlans,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WarmUpQuery::ExerciseCatalog => "exercise_catalog",
            WarmUpQuery::AchievementDefinitions => "achievement_definitions",
            WarmUpQuery::PopularRoutines => "popular_routines",
            WarmUpQuery::SubscriptionPlans => "subscription_plans",
        }
    }

    pub fn key(&self) -> String {
        match self {
            WarmUpQuery::ExerciseCatalog => keys::exercise_catalog(),
            WarmUpQuery::AchievementDefinitions => keys::achievement_definitions(),
            WarmUpQuery::PopularRoutines => keys::popular_routines(POPULAR_ROUTINES_LIMIT),
            WarmUpQuery::SubscriptionPlans => keys::subscription_plans(),
        }
    }

    pub fn tags(&self) -> [&'static str; 1] {
        match self {
            WarmUpQuery::ExerciseCatalog => [keys::EXERCISES],
            WarmUpQuery::AchievementDefinitions => [keys::ACHIEVEMENTS],
            WarmUpQuery::PopularRoutines => [keys::ROUTINES],
            WarmUpQuery::SubscriptionPlans => [keys::PLANS],
        }
    }

    /// Catalog data changes rarely; popularity rankings drift faster.
    pub fn ttl(&self) -> Duration {
        match self {
            WarmUpQuery::ExerciseCatalog => Duration::from_secs(60 * 60),
            WarmUpQuery::AchievementDefinitions => Duration::from_secs(60 * 60),
            WarmUpQuery::PopularRoutines => Duration::from_secs(15 * 60),
            WarmUpQuery::SubscriptionPlans => Duration::from_secs(30 * 60),
        }
    }

    fn options(&self) -> SetOptions {
        SetOptions::new().ttl(self.ttl()).tags(self.tags())
    }
}

/// Outcome of a warm-up run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarmUpReport {
    /// Names of queries now cached
    pub warmed: Vec<String>,
    /// Names of queries that failed
    pub failed: Vec<String>,
}

impl Cache {
    // == Warm Up ==
    /// Runs every [`WarmUpQuery`] against `records` and caches the results.
    ///
    /// Each query is independent; a failure is logged and the rest still run.
    pub async fn warm_up(&self, records: &dyn SystemOfRecord) -> WarmUpReport {
        let mut report = WarmUpReport::default();

        for query in WarmUpQuery::ALL {
            match self.warm_one(records, query).await {
                Ok(()) => report.warmed.push(query.name().to_string()),
                Err(err) => {
                    warn!(query = query.name(), error = %err, "warm-up query failed");
                    report.failed.push(query.name().to_string());
                }
            }
        }

        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            "cache warm-up finished"
        );
        report
    }

    async fn warm_one(&self, records: &dyn SystemOfRecord, query: WarmUpQuery) -> Result<()> {
        let key = query.key();
        let options = query.options();
        let fetched = match query {
            WarmUpQuery::ExerciseCatalog => records.exercises().await.map(to_value),
            WarmUpQuery::AchievementDefinitions => records.achievements().await.map(to_value),
            WarmUpQuery::PopularRoutines => records
                .popular_routines(POPULAR_ROUTINES_LIMIT)
                .await
                .map(to_value),
            WarmUpQuery::SubscriptionPlans => records.subscription_plans().await.map(to_value),
        };

        let value = fetched.map_err(CacheError::Fetch)??;
        self.set(&key, &value, options).await
    }
}

fn to_value<T: Serialize>(rows: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Page;
    use crate::config::CacheConfig;
    use crate::records::{
        Achievement, Exercise, InMemoryRecords, NewWorkout, Plan, Routine, Workout,
    };
    use async_trait::async_trait;

    /// Achievements query always fails.
    struct FlakyRecords(InMemoryRecords);

    #[async_trait]
    impl SystemOfRecord for FlakyRecords {
        async fn exercises(&self) -> anyhow::Result<Vec<Exercise>> {
            self.0.exercises().await
        }
        async fn achievements(&self) -> anyhow::Result<Vec<Achievement>> {
            anyhow::bail!("achievements table locked")
        }
        async fn popular_routines(&self, limit: u32) -> anyhow::Result<Vec<Routine>> {
            self.0.popular_routines(limit).await
        }
        async fn subscription_plans(&self) -> anyhow::Result<Vec<Plan>> {
            self.0.subscription_plans().await
        }
        async fn user_workouts(&self, user_id: u64, page: Page) -> anyhow::Result<Vec<Workout>> {
            self.0.user_workouts(user_id, page).await
        }
        async fn record_workout(&self, user_id: u64, w: NewWorkout) -> anyhow::Result<Workout> {
            self.0.record_workout(user_id, w).await
        }
    }

    #[tokio::test]
    async fn test_warm_up_caches_every_query() {
        let cache = Cache::new(CacheConfig::default());
        let records = InMemoryRecords::seeded();

        let report = cache.warm_up(&records).await;

        assert_eq!(report.warmed.len(), WarmUpQuery::ALL.len());
        assert!(report.failed.is_empty());
        let exercises: Vec<Exercise> = cache.get(&keys::exercise_catalog()).await.unwrap().unwrap();
        assert_eq!(exercises.len(), 5);
        let routines: Vec<Routine> = cache
            .get(&keys::popular_routines(POPULAR_ROUTINES_LIMIT))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(routines[0].name, "Couch to 5K");
    }

    #[tokio::test]
    async fn test_warm_up_failure_does_not_abort() {
        let cache = Cache::new(CacheConfig::default());
        let records = FlakyRecords(InMemoryRecords::seeded());

        let report = cache.warm_up(&records).await;

        assert_eq!(report.failed, vec!["achievement_definitions"]);
        assert_eq!(report.warmed.len(), 3);
        assert!(cache
            .get::<Vec<Achievement>>(&keys::achievement_definitions())
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .get::<Vec<Plan>>(&keys::subscription_plans())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_warmed_entries_are_tagged() {
        let cache = Cache::new(CacheConfig::default());
        cache.warm_up(&InMemoryRecords::seeded()).await;

        assert_eq!(cache.invalidate([keys::EXERCISES]).await, 1);
        assert_eq!(cache.len().await, 3);
    }

    #[test]
    fn test_query_metadata() {
        assert_eq!(WarmUpQuery::ExerciseCatalog.key(), "exercises:catalog");
        assert_eq!(WarmUpQuery::PopularRoutines.tags(), ["routines"]);
        assert!(WarmUpQuery::PopularRoutines.ttl() < WarmUpQuery::ExerciseCatalog.ttl());
    }
}
