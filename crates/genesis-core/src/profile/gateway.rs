use super::model::{Profile, ProfilePatch, Subscription};
use crate::error::Result;
use crate::identity::UserId;
use async_trait::async_trait;

/// Remote operations over `profiles` and `subscriptions`.
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// The subscription with status `active`, if any.
    async fn active_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>>;

    async fn update_profile(&self, user_id: &UserId, patch: ProfilePatch) -> Result<Profile>;
}
