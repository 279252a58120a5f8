//! Check-in, streak, badge and coach-note models.

use crate::date::yesterday_of;
use crate::error::GenesisError;
use crate::identity::{EntityId, Identified, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinType {
    Daily,
    Weekly,
}

impl CheckinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinType::Daily => "daily",
            CheckinType::Weekly => "weekly",
        }
    }
}

/// A row of `checkins`. Unique per (user, type, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkin {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(rename = "type")]
    pub kind: CheckinType,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub answers: CheckinDraft,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Checkin {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// The answer fields of a check-in. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soreness_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydration_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub challenges: Vec<String>,
}

impl CheckinDraft {
    pub fn into_checkin(self, id: EntityId, user_id: UserId, kind: CheckinType, date: NaiveDate) -> Checkin {
        Checkin {
            id,
            user_id: Some(user_id),
            kind,
            date,
            answers: self,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    Workout,
    Checkin,
    Hydration,
    Mindfulness,
}

impl StreakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakType::Workout => "workout",
            StreakType::Checkin => "checkin",
            StreakType::Hydration => "hydration",
            StreakType::Mindfulness => "mindfulness",
        }
    }
}

impl fmt::Display for StreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreakType {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout" => Ok(StreakType::Workout),
            "checkin" => Ok(StreakType::Checkin),
            "hydration" => Ok(StreakType::Hydration),
            "mindfulness" => Ok(StreakType::Mindfulness),
            other => Err(GenesisError::rejected(
                "streak_type",
                format!("unknown streak type '{other}'"),
            )),
        }
    }
}

/// A row of `streaks`, one per (user, type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub streak_type: StreakType,
    #[serde(default)]
    pub current_count: u32,
    #[serde(default)]
    pub longest_count: u32,
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,
    #[serde(default)]
    pub streak_started_at: Option<NaiveDate>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Streak {
    /// A streak started by activity on `today`.
    pub fn start(id: EntityId, user_id: UserId, streak_type: StreakType, today: NaiveDate) -> Self {
        Self {
            id,
            user_id: Some(user_id),
            streak_type,
            current_count: 1,
            longest_count: 1,
            last_activity_date: Some(today),
            streak_started_at: Some(today),
            updated_at: Some(Utc::now()),
        }
    }

    /// Records activity on `today`.
    ///
    /// Activity already counted today leaves the streak as is. Activity the
    /// day after the last one extends it, anything later restarts it at 1.
    pub fn advance(&self, today: NaiveDate, now: DateTime<Utc>) -> Self {
        if self.last_activity_date == Some(today) {
            return self.clone();
        }

        let continues = self.last_activity_date == Some(yesterday_of(today));
        let current_count = if continues { self.current_count + 1 } else { 1 };

        Self {
            current_count,
            longest_count: self.longest_count.max(current_count),
            last_activity_date: Some(today),
            streak_started_at: if continues {
                self.streak_started_at
            } else {
                Some(today)
            },
            updated_at: Some(now),
            ..self.clone()
        }
    }
}

/// An earned badge (row of `badges`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub badge_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachNotePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A note left by the coach (row of `coach_notes`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachNote {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub coach_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub priority: CoachNotePriority,
    /// Screens the note is shown on, e.g. `home`
    #[serde(default)]
    pub display_location: Vec<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub cta_action: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub show_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl CoachNote {
    pub fn shows_on(&self, location: &str) -> bool {
        self.display_location.iter().any(|l| l == location)
    }

    /// Active, not dismissed and not expired at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.dismissed_at.is_none() && self.show_until.is_none_or(|until| until > now)
    }
}

impl Identified for CoachNote {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// One point of the weekly weight chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
}
