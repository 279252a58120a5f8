//! Nutrition domain module.
//!
//! - `model`: food items, food log rows, meal partitions and macro targets
//! - `gateway`: remote operations over food logs and targets

mod gateway;
mod model;

pub use gateway::NutritionGateway;
pub use model::{FoodDraft, FoodItem, FoodLog, MacroTargets, MealType, Meals, NewFoodLog, TargetsPatch};
