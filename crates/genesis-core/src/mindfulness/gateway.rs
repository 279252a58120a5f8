use super::model::{MindfulnessSession, SessionDraft};
use crate::error::Result;
use crate::identity::UserId;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Remote operations over the `mindfulness_sessions` table.
#[async_trait]
pub trait MindfulnessGateway: Send + Sync {
    /// Sessions recorded on `date`, newest first.
    async fn sessions_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<MindfulnessSession>>;

    /// Most recent sessions, newest first.
    async fn session_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<MindfulnessSession>>;

    async fn record_session(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        draft: SessionDraft,
    ) -> Result<MindfulnessSession>;
}
