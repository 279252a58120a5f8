//! Nutrition store: today's meals and macro targets.

use super::reconcile::{PendingCreates, remove_by_id, replace_in_place};
use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use chrono::NaiveDate;
use genesis_core::date::today;
use genesis_core::error::Result;
use genesis_core::nutrition::{
    FoodDraft, FoodItem, FoodLog, MacroTargets, MealType, Meals, NewFoodLog, NutritionGateway, TargetsPatch,
};
use genesis_core::{EntityId, UserId};
use std::sync::Arc;
use tokio::sync::watch;

const STORE: &str = "NutritionStore";

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionState {
    pub meals: Meals,
    pub targets: MacroTargets,
    pub current_date: NaiveDate,
    pub is_loading: bool,
    pub error: Option<String>,
    pub pending: PendingCreates,
}

impl NutritionState {
    pub fn new(targets: MacroTargets) -> Self {
        Self {
            meals: Meals::default(),
            targets,
            current_date: today(),
            is_loading: false,
            error: None,
            pending: PendingCreates::default(),
        }
    }
}

impl Default for NutritionState {
    fn default() -> Self {
        Self::new(MacroTargets::default())
    }
}

super::impl_has_status!(NutritionState);

#[derive(Debug, Clone, PartialEq)]
pub enum NutritionMutation {
    AddFood { meal: MealType, item: FoodItem },
    RemoveFood { meal: MealType, id: EntityId },
    ClearMeal { meal: MealType },
    SetTargets(TargetsPatch),
}

impl NutritionMutation {
    /// Keys the item with the draft's id, or a fresh temporary one.
    pub fn add_food(meal: MealType, mut draft: FoodDraft) -> Self {
        let id = draft.id.take().unwrap_or_else(|| EntityId::temporary(meal.as_str()));
        NutritionMutation::AddFood {
            meal,
            item: draft.into_item(id),
        }
    }
}

/// Synchronous phase of a nutrition mutation.
pub fn apply(state: &mut NutritionState, mutation: &NutritionMutation) -> LocalResult {
    match mutation {
        NutritionMutation::AddFood { meal, item } => {
            state.meals.get_mut(*meal).push(item.clone());
            LocalResult::Applied(Some(item.id.clone()))
        }
        NutritionMutation::RemoveFood { meal, id } => {
            if remove_by_id(state.meals.get_mut(*meal), id) {
                state.pending.discard(id);
                LocalResult::Applied(Some(id.clone()))
            } else {
                LocalResult::Unchanged
            }
        }
        NutritionMutation::ClearMeal { meal } => {
            let partition = state.meals.get_mut(*meal);
            if partition.is_empty() {
                return LocalResult::Unchanged;
            }
            for item in partition.drain(..) {
                state.pending.discard(&item.id);
            }
            LocalResult::Applied(None)
        }
        NutritionMutation::SetTargets(patch) => {
            patch.apply(&mut state.targets);
            LocalResult::Applied(None)
        }
    }
}

/// Folds a persist completion into nutrition state.
pub fn reconcile(mut state: NutritionState, outcome: &PersistOutcome<FoodItem>) -> (NutritionState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Created { temp_id, record } => {
            if state.pending.settle(temp_id) {
                ReconcileOutcome::Orphaned {
                    temp_id: temp_id.clone(),
                    server_id: record.id.clone(),
                }
            } else {
                match state.meals.partition_of(temp_id) {
                    Some(meal) => {
                        replace_in_place(state.meals.get_mut(meal), temp_id, record);
                        ReconcileOutcome::Replaced {
                            temp_id: temp_id.clone(),
                            server_id: record.id.clone(),
                        }
                    }
                    // A wholesale fetch already replaced the partition.
                    None => ReconcileOutcome::Acknowledged,
                }
            }
        }
        PersistOutcome::Saved(_) | PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { temp_id, error } => {
            if let Some(temp_id) = temp_id {
                state.pending.settle(temp_id);
            }
            record_failure(&mut state, error)
        }
    };
    (state, result)
}

/// Buckets food logs by meal type in server order.
fn bucket(logs: Vec<FoodLog>) -> Meals {
    let mut meals = Meals::default();
    for log in logs {
        match log.meal_type.parse::<MealType>() {
            Ok(meal) => meals.get_mut(meal).push(log.to_item()),
            Err(_) => {
                tracing::warn!(id = %log.id, meal_type = %log.meal_type, "[NutritionStore] skipping food log with unknown meal type");
            }
        }
    }
    meals
}

pub struct NutritionStore {
    cell: StoreCell<NutritionState>,
    gateway: Arc<dyn NutritionGateway>,
    default_targets: MacroTargets,
}

impl NutritionStore {
    pub fn new(gateway: Arc<dyn NutritionGateway>, default_targets: MacroTargets) -> Self {
        Self {
            cell: StoreCell::new(NutritionState::new(default_targets)),
            gateway,
            default_targets,
        }
    }

    pub fn snapshot(&self) -> NutritionState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&NutritionState) -> R) -> R {
        self.cell.read(f)
    }

    pub fn status(&self) -> StoreStatus {
        self.cell.read(StoreStatus::of)
    }

    pub fn revision(&self) -> u64 {
        self.cell.revision()
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.cell.subscribe()
    }

    /// Replaces `meals` with today's food logs.
    pub async fn fetch_today(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let date = today();
        let result = self.gateway.food_logs_by_date(user_id, date).await;
        finish_load(&self.cell, STORE, generation, result, |state, logs| {
            state.meals = bucket(logs);
            state.current_date = date;
        })
    }

    /// Replaces targets with the server's row; keeps the current ones if there is none.
    ///
    /// Failures are logged and returned but not recorded in `error`.
    pub async fn fetch_targets(&self, user_id: &UserId) -> Result<()> {
        let generation = self.cell.generation();
        match self.gateway.targets(user_id).await {
            Ok(Some(targets)) => {
                if self.cell.update_if_current(generation, |state| state.targets = targets).is_none() {
                    tracing::debug!(generation, "[NutritionStore] discarding targets fetched before reset");
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::error!(%user_id, error = %e, "[NutritionStore] failed to fetch nutrition targets");
                Err(e)
            }
        }
    }

    /// Fetches today's meals and the targets concurrently.
    pub async fn fetch_all(&self, user_id: &UserId) -> Result<()> {
        let (meals, targets) = tokio::join!(self.fetch_today(user_id), self.fetch_targets(user_id));
        meals.and(targets)
    }

    pub fn apply_local(&self, mutation: &NutritionMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    /// Issues the network call for an already applied mutation.
    ///
    /// Removing a food item only reaches the server when its id is a server
    /// id; every other mutation needs `user_id`.
    pub fn schedule_persist(
        self: &Arc<Self>,
        mutation: NutritionMutation,
        user_id: Option<&UserId>,
    ) -> Option<PersistTask> {
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        match mutation {
            NutritionMutation::AddFood { meal, item } => {
                let user_id = user_id?.clone();
                let date = self.cell.update(|state| {
                    state.pending.track(item.id.clone());
                    state.current_date
                });
                Some(PersistTask::spawn(async move {
                    let payload = NewFoodLog::from_item(meal, date, &item);
                    let result = store.gateway.create_food_log(&user_id, payload).await;
                    let outcome = PersistOutcome::from_create(item.id.clone(), result.map(|log| log.to_item()));
                    let result = settle(&store.cell, STORE, generation, outcome, reconcile);
                    if let ReconcileOutcome::Orphaned { server_id, .. } = &result {
                        store.delete_orphan(server_id).await;
                    }
                    result
                }))
            }
            NutritionMutation::RemoveFood { id, .. } => {
                if !id.is_server() {
                    return None;
                }
                Some(PersistTask::spawn(async move {
                    let result = store.gateway.delete_food_log(&id).await;
                    settle(&store.cell, STORE, generation, PersistOutcome::from_ack(result), reconcile)
                }))
            }
            NutritionMutation::ClearMeal { meal } => {
                let user_id = user_id?.clone();
                let date = self.cell.read(|state| state.current_date);
                Some(PersistTask::spawn(async move {
                    let result = store.gateway.clear_meal(&user_id, meal, date).await;
                    settle(&store.cell, STORE, generation, PersistOutcome::from_ack(result), reconcile)
                }))
            }
            NutritionMutation::SetTargets(patch) => {
                let user_id = user_id?.clone();
                Some(PersistTask::spawn(async move {
                    let result = store.gateway.upsert_targets(&user_id, patch).await;
                    settle(&store.cell, STORE, generation, PersistOutcome::from_ack(result), reconcile)
                }))
            }
        }
    }

    /// Adds a food item to `meal`, persisting it when `user_id` is known.
    pub fn add_food(self: &Arc<Self>, meal: MealType, draft: FoodDraft, user_id: Option<&UserId>) -> Submitted {
        self.submit(NutritionMutation::add_food(meal, draft), user_id)
    }

    pub fn remove_food(self: &Arc<Self>, meal: MealType, id: EntityId) -> Submitted {
        self.submit(NutritionMutation::RemoveFood { meal, id }, None)
    }

    /// Empties `meal`. The bulk delete is sent even when the partition is
    /// already empty locally.
    pub fn clear_meal(self: &Arc<Self>, meal: MealType, user_id: Option<&UserId>) -> Submitted {
        self.submit(NutritionMutation::ClearMeal { meal }, user_id)
    }

    pub fn set_targets(self: &Arc<Self>, patch: TargetsPatch, user_id: Option<&UserId>) -> Submitted {
        self.submit(NutritionMutation::SetTargets(patch), user_id)
    }

    pub fn reset(&self) {
        self.cell.reset(NutritionState::new(self.default_targets));
    }

    fn submit(self: &Arc<Self>, mutation: NutritionMutation, user_id: Option<&UserId>) -> Submitted {
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, user_id);
        Submitted { local, persist }
    }

    async fn delete_orphan(&self, server_id: &EntityId) {
        if let Err(e) = self.gateway.delete_food_log(server_id).await {
            tracing::error!(%server_id, error = %e, "[NutritionStore] failed to delete orphaned food log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salad() -> FoodDraft {
        FoodDraft::new("Salad", 200.0, 10.0, 20.0, 5.0)
    }

    fn server_item(id: &str, name: &str) -> FoodItem {
        FoodDraft::new(name, 200.0, 10.0, 20.0, 5.0).into_item(EntityId::new(id))
    }

    #[test]
    fn test_add_food_mints_temporary_id() {
        let mut state = NutritionState::default();
        let mutation = NutritionMutation::add_food(MealType::Lunch, salad());
        let local = apply(&mut state, &mutation);

        let id = local.id().unwrap().clone();
        assert!(id.is_temporary());
        assert_eq!(state.meals.lunch.len(), 1);
        assert_eq!(state.meals.lunch[0].id, id);
    }

    #[test]
    fn test_add_food_uses_supplied_id() {
        let mut state = NutritionState::default();
        let draft = FoodDraft {
            id: Some(EntityId::new("mine")),
            ..salad()
        };
        apply(&mut state, &NutritionMutation::add_food(MealType::Dinner, draft));
        assert_eq!(state.meals.dinner[0].id, EntityId::new("mine"));
    }

    #[test]
    fn test_reconcile_replaces_in_place() {
        let mut state = NutritionState::default();
        state.meals.lunch.push(server_item("a", "Rice"));
        let temp = apply(&mut state, &NutritionMutation::add_food(MealType::Lunch, salad()))
            .id()
            .cloned()
            .unwrap();
        state.meals.lunch.push(server_item("c", "Soup"));
        state.pending.track(temp.clone());

        let server_id = "550e8400-e29b-41d4-a716-446655440000";
        let outcome = PersistOutcome::Created {
            temp_id: temp.clone(),
            record: server_item(server_id, "Salad"),
        };
        let (state, result) = reconcile(state, &outcome);

        assert!(matches!(result, ReconcileOutcome::Replaced { .. }));
        let ids: Vec<_> = state.meals.lunch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", server_id, "c"]);
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_reconcile_after_removal_does_not_resurrect() {
        let mut state = NutritionState::default();
        let temp = apply(&mut state, &NutritionMutation::add_food(MealType::Lunch, salad()))
            .id()
            .cloned()
            .unwrap();
        state.pending.track(temp.clone());
        apply(
            &mut state,
            &NutritionMutation::RemoveFood {
                meal: MealType::Lunch,
                id: temp.clone(),
            },
        );

        let outcome = PersistOutcome::Created {
            temp_id: temp.clone(),
            record: server_item("550e8400-e29b-41d4-a716-446655440000", "Salad"),
        };
        let (state, result) = reconcile(state, &outcome);

        assert!(matches!(result, ReconcileOutcome::Orphaned { .. }));
        assert!(state.meals.is_empty());
    }

    #[test]
    fn test_failure_keeps_optimistic_item() {
        let mut state = NutritionState::default();
        let temp = apply(&mut state, &NutritionMutation::add_food(MealType::Snacks, salad()))
            .id()
            .cloned()
            .unwrap();
        state.pending.track(temp.clone());

        let outcome = PersistOutcome::<FoodItem>::Failed {
            temp_id: Some(temp.clone()),
            error: genesis_core::GenesisError::transport("offline"),
        };
        let (state, result) = reconcile(state, &outcome);

        assert!(result.is_failed());
        assert_eq!(state.meals.snacks[0].id, temp);
        assert_eq!(state.error.as_deref(), Some("Transport error: offline"));
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_clear_empty_partition_is_unchanged() {
        let mut state = NutritionState::default();
        let mutation = NutritionMutation::ClearMeal { meal: MealType::Dinner };
        assert_eq!(apply(&mut state, &mutation), LocalResult::Unchanged);
        assert_eq!(apply(&mut state, &mutation), LocalResult::Unchanged);
        assert!(state.meals.dinner.is_empty());
    }

    #[test]
    fn test_bucket_skips_unknown_meal_types() {
        let log = |id: &str, meal: &str| FoodLog {
            id: EntityId::new(id),
            user_id: None,
            date: today(),
            meal_type: meal.to_string(),
            name: "x".into(),
            calories: 1.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            created_at: None,
        };
        let meals = bucket(vec![log("a1", "breakfast"), log("a2", "brunch"), log("a3", "breakfast")]);
        assert_eq!(meals.breakfast.len(), 2);
        assert_eq!(meals.len(), 2);
    }
}
