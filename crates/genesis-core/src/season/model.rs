//! Season and workout models.

use crate::identity::{EntityId, Identified, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPhase {
    #[default]
    Foundation,
    Construction,
    Optimization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    Scheduled,
    InProgress,
    Completed,
    Skipped,
}

/// A training season (row of `seasons`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub number: u32,
    pub goal: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub target_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_week: Option<u32>,
    #[serde(default)]
    pub current_phase: Option<SeasonPhase>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identified for Season {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// A scheduled workout (row of `workouts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub season_id: Option<EntityId>,
    pub title: String,
    #[serde(rename = "type", default)]
    pub workout_type: Option<String>,
    /// ISO day of week (1 = Monday)
    pub day_of_week: u32,
    pub week_number: u32,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<WorkoutStatus>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<u32>,
    #[serde(default)]
    pub focus_muscles: Vec<String>,
}

/// One exercise of a workout (row of `exercise_blocks`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBlock {
    pub id: EntityId,
    #[serde(default)]
    pub workout_id: Option<EntityId>,
    pub exercise_name: String,
    pub order_index: u32,
    #[serde(default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutWithExercises {
    #[serde(flatten)]
    pub workout: Workout,
    #[serde(default)]
    pub exercise_blocks: Vec<ExerciseBlock>,
}

/// Update payload for the season's position in its plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonProgress {
    pub current_week: u32,
    pub current_phase: SeasonPhase,
}

impl SeasonProgress {
    pub fn apply(&self, season: &mut Season) {
        season.current_week = Some(self.current_week);
        season.current_phase = Some(self.current_phase);
    }
}
