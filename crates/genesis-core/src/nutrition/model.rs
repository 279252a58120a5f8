//! Nutrition domain models.

use crate::error::GenesisError;
use crate::identity::{EntityId, Identified, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meal partition a food item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealType {
    /// All partitions in display order.
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snacks => "snacks",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snacks" => Ok(MealType::Snacks),
            other => Err(GenesisError::rejected(
                "meal_type",
                format!("unknown meal type '{other}'"),
            )),
        }
    }
}

/// A food item as held by the nutrition store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: EntityId,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Identified for FoodItem {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Input for adding a food item; `id` may be supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl FoodDraft {
    pub fn new(name: impl Into<String>, calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            calories,
            protein,
            carbs,
            fat,
        }
    }

    pub fn into_item(self, id: EntityId) -> FoodItem {
        FoodItem {
            id,
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

/// Server row of the `food_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLog {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub date: NaiveDate,
    /// Kept as text: rows written by other clients may carry values this
    /// client does not know.
    pub meal_type: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FoodLog {
    pub fn to_item(&self) -> FoodItem {
        FoodItem {
            id: self.id.clone(),
            name: self.name.clone(),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

impl Identified for FoodLog {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Insert payload for `food_logs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFoodLog {
    pub meal_type: MealType,
    pub date: NaiveDate,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NewFoodLog {
    pub fn from_item(meal_type: MealType, date: NaiveDate, item: &FoodItem) -> Self {
        Self {
            meal_type,
            date,
            name: item.name.clone(),
            calories: item.calories,
            protein: item.protein,
            carbs: item.carbs,
            fat: item.fat,
        }
    }
}

/// Daily macro targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroTargets {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            calories: 2400.0,
            protein: 180.0,
            carbs: 250.0,
            fat: 70.0,
        }
    }
}

/// Partial update of [`MacroTargets`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

impl TargetsPatch {
    pub fn apply(&self, targets: &mut MacroTargets) {
        if let Some(calories) = self.calories {
            targets.calories = calories;
        }
        if let Some(protein) = self.protein {
            targets.protein = protein;
        }
        if let Some(carbs) = self.carbs {
            targets.carbs = carbs;
        }
        if let Some(fat) = self.fat {
            targets.fat = fat;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calories.is_none() && self.protein.is_none() && self.carbs.is_none() && self.fat.is_none()
    }
}

/// The four meal partitions of one day, each in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Meals {
    pub breakfast: Vec<FoodItem>,
    pub lunch: Vec<FoodItem>,
    pub dinner: Vec<FoodItem>,
    pub snacks: Vec<FoodItem>,
}

impl Meals {
    pub fn get(&self, meal: MealType) -> &Vec<FoodItem> {
        match meal {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Dinner => &self.dinner,
            MealType::Snacks => &self.snacks,
        }
    }

    pub fn get_mut(&mut self, meal: MealType) -> &mut Vec<FoodItem> {
        match meal {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
            MealType::Snacks => &mut self.snacks,
        }
    }

    /// All items across partitions, breakfast first.
    pub fn iter(&self) -> impl Iterator<Item = &FoodItem> {
        MealType::ALL.into_iter().flat_map(move |meal| self.get(meal).iter())
    }

    /// The partition holding `id`, if any.
    pub fn partition_of(&self, id: &EntityId) -> Option<MealType> {
        MealType::ALL
            .into_iter()
            .find(|meal| self.get(*meal).iter().any(|item| &item.id == id))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.partition_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        MealType::ALL.into_iter().map(|meal| self.get(meal).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_type_round_trips_through_str() {
        for meal in MealType::ALL {
            assert_eq!(meal.as_str().parse::<MealType>().unwrap(), meal);
        }
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn test_targets_patch_only_touches_named_fields() {
        let mut targets = MacroTargets::default();
        TargetsPatch {
            protein: Some(200.0),
            ..Default::default()
        }
        .apply(&mut targets);

        assert_eq!(targets.protein, 200.0);
        assert_eq!(targets.calories, 2400.0);
        assert_eq!(targets.fat, 70.0);
    }

    #[test]
    fn test_partition_lookup() {
        let mut meals = Meals::default();
        meals
            .get_mut(MealType::Dinner)
            .push(FoodDraft::new("Rice", 200.0, 4.0, 45.0, 0.5).into_item(EntityId::new("d1")));

        assert_eq!(meals.partition_of(&EntityId::new("d1")), Some(MealType::Dinner));
        assert!(!meals.contains(&EntityId::new("missing")));
        assert_eq!(meals.len(), 1);
    }
}
