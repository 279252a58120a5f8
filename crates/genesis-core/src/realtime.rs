//! Push-subscription primitives.
//!
//! A push channel is keyed by a [`Topic`] (channel kind and user). Opening
//! one hands the gateway the sending half of a bounded queue; the gateway
//! pushes [`PushEvent`]s into it until the handle is closed.

use crate::chat::Message;
use crate::error::Result;
use crate::identity::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Kinds of server-pushed streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Inserts into the user's `messages`
    Messages,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Messages => "messages",
        }
    }
}

/// A (channel kind, user) pair. At most one handle per topic is live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub kind: ChannelKind,
    pub user_id: UserId,
}

impl Topic {
    pub fn messages(user_id: UserId) -> Self {
        Self {
            kind: ChannelKind::Messages,
            user_id,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.user_id)
    }
}

/// Events delivered over a push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// A message row was inserted server-side.
    MessageInserted { message: Message },
}

pub type EventSender = mpsc::Sender<PushEvent>;
pub type EventReceiver = mpsc::Receiver<PushEvent>;

/// Token for one open push channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: Uuid,
    pub topic: Topic,
}

impl SubscriptionHandle {
    pub fn new(topic: Topic) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
        }
    }
}

/// The push half of the remote gateway.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Opens a channel for `topic`; events are sent into `events` in arrival order.
    async fn open(&self, topic: &Topic, events: EventSender) -> Result<SubscriptionHandle>;

    /// Closes a channel. Closing an unknown handle succeeds.
    async fn close(&self, handle: SubscriptionHandle) -> Result<()>;
}
