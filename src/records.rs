//! System of Record
//!
//! The read and write queries the cache sits in front of. The production
//! database lives elsewhere; [`InMemoryRecords`] is a seeded stand-in used
//! by the binary and the tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::Page;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: u64,
    pub name: String,
    pub muscle_group: String,
    pub equipment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Number of qualifying workouts needed to unlock
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: u64,
    pub name: String,
    pub difficulty: String,
    pub followers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub duration_minutes: u32,
    pub performed_at: DateTime<Utc>,
}

/// Body of a workout log request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkout {
    pub name: String,
    pub duration_minutes: u32,
}

// == System Of Record Trait ==
/// Queries served from the primary database.
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    async fn exercises(&self) -> anyhow::Result<Vec<Exercise>>;

    async fn achievements(&self) -> anyhow::Result<Vec<Achievement>>;

    /// Routines ordered by follower count, most followed first.
    async fn popular_routines(&self, limit: u32) -> anyhow::Result<Vec<Routine>>;

    async fn subscription_plans(&self) -> anyhow::Result<Vec<Plan>>;

    /// A user's workouts, newest first.
    async fn user_workouts(&self, user_id: u64, page: Page) -> anyhow::Result<Vec<Workout>>;

    async fn record_workout(&self, user_id: u64, workout: NewWorkout) -> anyhow::Result<Workout>;
}

// == In-Memory Records ==
/// Seeded in-process implementation of [`SystemOfRecord`].
///
/// Counts every query it serves so callers can observe cache effectiveness.
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    exercises: Vec<Exercise>,
    achievements: Vec<Achievement>,
    routines: Vec<Routine>,
    plans: Vec<Plan>,
    workouts: RwLock<Vec<Workout>>,
    next_workout_id: AtomicU64,
    queries: AtomicUsize,
}

impl InMemoryRecords {
    /// Empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record set with a small catalog of exercises, achievements, routines and plans.
    pub fn seeded() -> Self {
        let exercise = |id, name: &str, group: &str, equipment: Option<&str>| Exercise {
            id,
            name: name.to_string(),
            muscle_group: group.to_string(),
            equipment: equipment.map(String::from),
        };
        let routine = |id, name: &str, difficulty: &str, followers| Routine {
            id,
            name: name.to_string(),
            difficulty: difficulty.to_string(),
            followers,
        };

        Self {
            exercises: vec![
                exercise(1, "Back Squat", "legs", Some("barbell")),
                exercise(2, "Push-up", "chest", None),
                exercise(3, "Deadlift", "posterior chain", Some("barbell")),
                exercise(4, "Kettlebell Swing", "posterior chain", Some("kettlebell")),
                exercise(5, "Pull-up", "back", Some("bar")),
            ],
            achievements: vec![
                Achievement {
                    id: 1,
                    name: "First Rep".to_string(),
                    description: "Log your first workout".to_string(),
                    threshold: 1,
                },
                Achievement {
                    id: 2,
                    name: "Consistency".to_string(),
                    description: "Log 30 workouts".to_string(),
                    threshold: 30,
                },
            ],
            routines: vec![
                routine(1, "Starting Strength", "beginner", 1_250),
                routine(2, "5/3/1", "intermediate", 980),
                routine(3, "Couch to 5K", "beginner", 2_400),
                routine(4, "Hybrid Athlete", "advanced", 310),
            ],
            plans: vec![
                Plan {
                    id: "free".to_string(),
                    name: "Free".to_string(),
                    price_cents: 0,
                    interval: "month".to_string(),
                },
                Plan {
                    id: "pro".to_string(),
                    name: "Pro".to_string(),
                    price_cents: 999,
                    interval: "month".to_string(),
                },
            ],
            ..Self::default()
        }
    }

    /// Number of queries served so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SystemOfRecord for InMemoryRecords {
    async fn exercises(&self) -> anyhow::Result<Vec<Exercise>> {
        self.count();
        Ok(self.exercises.clone())
    }

    async fn achievements(&self) -> anyhow::Result<Vec<Achievement>> {
        self.count();
        Ok(self.achievements.clone())
    }

    async fn popular_routines(&self, limit: u32) -> anyhow::Result<Vec<Routine>> {
        self.count();
        let mut routines = self.routines.clone();
        routines.sort_by(|a, b| b.followers.cmp(&a.followers));
        routines.truncate(limit as usize);
        Ok(routines)
    }

    async fn subscription_plans(&self) -> anyhow::Result<Vec<Plan>> {
        self.count();
        Ok(self.plans.clone())
    }

    async fn user_workouts(&self, user_id: u64, page: Page) -> anyhow::Result<Vec<Workout>> {
        self.count();
        let workouts = self.workouts.read().await;
        Ok(workouts
            .iter()
            .rev()
            .filter(|w| w.user_id == user_id)
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn record_workout(&self, user_id: u64, workout: NewWorkout) -> anyhow::Result<Workout> {
        if workout.name.trim().is_empty() {
            anyhow::bail!("workout name cannot be empty");
        }

        let record = Workout {
            id: self.next_workout_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            name: workout.name,
            duration_minutes: workout.duration_minutes,
            performed_at: Utc::now(),
        };
        self.workouts.write().await.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_popular_routines_sorted_and_limited() {
        let records = InMemoryRecords::seeded();
        let routines = records.popular_routines(2).await.unwrap();

        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].name, "Couch to 5K");
        assert_eq!(routines[1].name, "Starting Strength");
    }

    #[tokio::test]
    async fn test_user_workouts_newest_first_and_paged() {
        let records = InMemoryRecords::new();
        for name in ["a", "b", "c"] {
            records
                .record_workout(
                    1,
                    NewWorkout {
                        name: name.to_string(),
                        duration_minutes: 30,
                    },
                )
                .await
                .unwrap();
        }
        records
            .record_workout(
                2,
                NewWorkout {
                    name: "other".to_string(),
                    duration_minutes: 10,
                },
            )
            .await
            .unwrap();

        let page = records.user_workouts(1, Page::new(2, 0)).await.unwrap();
        let names: Vec<_> = page.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);

        let page = records.user_workouts(1, Page::new(2, 2)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "a");
    }

    #[tokio::test]
    async fn test_record_workout_rejects_empty_name() {
        let records = InMemoryRecords::new();
        let result = records
            .record_workout(
                1,
                NewWorkout {
                    name: "  ".to_string(),
                    duration_minutes: 5,
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_queries_counted() {
        let records = InMemoryRecords::seeded();
        records.exercises().await.unwrap();
        records.achievements().await.unwrap();
        assert_eq!(records.queries(), 2);
    }
}
