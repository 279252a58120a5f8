use super::model::{Message, MessageType};
use crate::error::Result;
use crate::identity::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Remote operations over the `messages` table.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// The latest `limit` messages in chronological order.
    async fn recent_messages(&self, user_id: &UserId, limit: usize) -> Result<Vec<Message>>;

    /// Messages created at or after `since`, oldest first.
    ///
    /// Used by polling push channels, which drop the repeats at `since`.
    async fn messages_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<Vec<Message>>;

    /// Number of unread messages not authored by the user.
    async fn unread_count(&self, user_id: &UserId) -> Result<u32>;

    async fn send_message(
        &self,
        user_id: &UserId,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message>;

    /// Stamps `read_at` on every unread incoming message.
    async fn mark_as_read(&self, user_id: &UserId) -> Result<()>;
}
