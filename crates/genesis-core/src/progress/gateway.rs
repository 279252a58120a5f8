use super::model::{Badge, Checkin, CheckinDraft, CheckinType, CoachNote, Streak, StreakType, WeightEntry};
use crate::error::Result;
use crate::identity::{EntityId, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Remote operations over `checkins`.
#[async_trait]
pub trait CheckinGateway: Send + Sync {
    /// The daily check-in for `date`, if submitted.
    async fn checkin_on(&self, user_id: &UserId, kind: CheckinType, date: NaiveDate) -> Result<Option<Checkin>>;

    /// The most recent weekly check-in.
    async fn latest_weekly_checkin(&self, user_id: &UserId) -> Result<Option<Checkin>>;

    /// Inserts or replaces the check-in keyed by (user, kind, date).
    async fn upsert_checkin(
        &self,
        user_id: &UserId,
        kind: CheckinType,
        date: NaiveDate,
        draft: CheckinDraft,
    ) -> Result<Checkin>;

    /// Weekly weights, oldest first, at most `limit` points.
    async fn weight_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<WeightEntry>>;
}

/// Remote operations over `streaks`, `badges` and `coach_notes`.
#[async_trait]
pub trait CoachGateway: Send + Sync {
    async fn streaks(&self, user_id: &UserId) -> Result<Vec<Streak>>;

    /// Records activity for `kind` on `today` following [`Streak::advance`].
    async fn update_streak(&self, user_id: &UserId, kind: StreakType, today: NaiveDate) -> Result<Streak>;

    /// Earned badges, newest first.
    async fn badges(&self, user_id: &UserId) -> Result<Vec<Badge>>;

    /// Visible notes for a screen location, newest first.
    async fn coach_notes(&self, user_id: &UserId, location: &str) -> Result<Vec<CoachNote>>;

    async fn dismiss_coach_note(&self, note_id: &EntityId) -> Result<CoachNote>;
}
