//! Season domain module.

mod gateway;
mod model;

pub use gateway::SeasonGateway;
pub use model::{ExerciseBlock, Season, SeasonPhase, SeasonProgress, Workout, WorkoutStatus, WorkoutWithExercises};
