//! Progress domain module.
//!
//! Check-ins, streaks, badges and coach notes. The streak rule lives on
//! [`Streak::advance`] so every gateway applies it the same way.

mod gateway;
mod model;

pub use gateway::{CheckinGateway, CoachGateway};
pub use model::{
    Badge, Checkin, CheckinDraft, CheckinType, CoachNote, CoachNotePriority, Streak, StreakType, WeightEntry,
};
