//! Mindfulness domain models.

use crate::identity::{EntityId, Identified, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One recorded mindfulness session (row of `mindfulness_sessions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindfulnessSession {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub date: NaiveDate,
    /// Catalog id of the guided session that was played
    pub session_id: String,
    pub session_title: String,
    #[serde(default)]
    pub category: Option<String>,
    pub duration_seconds: u32,
    #[serde(default)]
    pub target_duration_seconds: Option<u32>,
    pub completed: bool,
    #[serde(default)]
    pub phases_completed: Option<u32>,
    #[serde(default)]
    pub total_phases: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identified for MindfulnessSession {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Input for recording a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionDraft {
    pub session_id: String,
    pub session_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration_seconds: Option<u32>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_phases: Option<u32>,
}

impl SessionDraft {
    pub fn into_session(self, id: EntityId, user_id: Option<UserId>, date: NaiveDate) -> MindfulnessSession {
        MindfulnessSession {
            id,
            user_id,
            date,
            session_id: self.session_id,
            session_title: self.session_title,
            category: self.category,
            duration_seconds: self.duration_seconds,
            target_duration_seconds: self.target_duration_seconds,
            completed: self.completed,
            phases_completed: self.phases_completed,
            total_phases: self.total_phases,
            created_at: None,
        }
    }
}
