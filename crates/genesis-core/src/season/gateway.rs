use super::model::{Season, SeasonProgress, Workout, WorkoutWithExercises};
use crate::error::Result;
use crate::identity::{EntityId, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Remote operations over `seasons`, `workouts` and `exercise_blocks`.
#[async_trait]
pub trait SeasonGateway: Send + Sync {
    /// The user's season with status `active`, if any.
    async fn active_season(&self, user_id: &UserId) -> Result<Option<Season>>;

    /// The workout scheduled on `date`, with its exercise blocks.
    async fn workout_on(&self, user_id: &UserId, date: NaiveDate) -> Result<Option<WorkoutWithExercises>>;

    /// Workouts of one week of a season, by day of week.
    async fn week_workouts(&self, user_id: &UserId, season_id: &EntityId, week: u32) -> Result<Vec<Workout>>;

    async fn update_season_progress(&self, season_id: &EntityId, progress: SeasonProgress) -> Result<Season>;
}
