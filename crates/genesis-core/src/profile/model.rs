//! Profile and plan subscription models.

use crate::identity::{EntityId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A row of `profiles`; its id is the user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub primary_goal: Option<String>,
    #[serde(default)]
    pub fitness_level: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub training_days_per_week: Option<u8>,
    #[serde(default)]
    pub session_duration_minutes: Option<u32>,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update of a [`Profile`]. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_days_per_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_equipment: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut Profile) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    profile.$field = value.clone().into();
                })*
            };
        }
        merge!(full_name, avatar_url, primary_goal, fitness_level, weight_kg, height_cm, training_days_per_week, session_duration_minutes, timezone);
        if let Some(equipment) = &self.available_equipment {
            profile.available_equipment = equipment.clone();
        }
        if let Some(done) = self.onboarding_completed {
            profile.onboarding_completed = done;
        }
    }
}

/// The user's plan (row of `subscriptions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// `ascend`, `hybrid_basic`, `hybrid_pro` or `hybrid_elite`
    pub plan: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_hybrid(&self) -> bool {
        self.plan.contains("hybrid")
    }
}
