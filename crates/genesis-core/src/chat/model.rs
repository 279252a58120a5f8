//! Chat message types.

use crate::identity::{EntityId, Identified, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message from the GENESIS assistant.
    Genesis,
    /// Message from the human coach.
    Coach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Voice,
    Image,
}

/// A single chat message (row of `messages`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub is_coach_note: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Builds a locally authored user message.
    pub fn outgoing(id: EntityId, user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id,
            user_id: Some(user_id),
            role: MessageRole::User,
            content: content.into(),
            message_type: MessageType::Text,
            is_coach_note: false,
            created_at: Some(Utc::now()),
            read_at: None,
        }
    }

    /// True for messages that count towards the unread badge.
    pub fn is_unread_incoming(&self) -> bool {
        self.role != MessageRole::User && self.read_at.is_none()
    }
}

impl Identified for Message {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}
