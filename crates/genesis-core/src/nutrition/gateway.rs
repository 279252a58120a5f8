//! Nutrition gateway trait.
//!
//! Remote operations over the `food_logs` and `nutrition_targets` tables.

use super::model::{FoodLog, MacroTargets, MealType, NewFoodLog, TargetsPatch};
use crate::error::Result;
use crate::identity::{EntityId, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait NutritionGateway: Send + Sync {
    /// Food logs of `date`, oldest first.
    async fn food_logs_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<FoodLog>>;

    /// Inserts a food log and returns the stored row with its server id.
    async fn create_food_log(&self, user_id: &UserId, log: NewFoodLog) -> Result<FoodLog>;

    /// Deletes one food log. Deleting a missing row succeeds.
    async fn delete_food_log(&self, log_id: &EntityId) -> Result<()>;

    /// Deletes every food log of a meal partition on `date`.
    async fn clear_meal(&self, user_id: &UserId, meal_type: MealType, date: NaiveDate) -> Result<()>;

    /// The user's macro targets, or `None` when no row exists yet.
    async fn targets(&self, user_id: &UserId) -> Result<Option<MacroTargets>>;

    /// Creates or updates the user's targets with the given fields.
    async fn upsert_targets(&self, user_id: &UserId, patch: TargetsPatch) -> Result<MacroTargets>;
}
