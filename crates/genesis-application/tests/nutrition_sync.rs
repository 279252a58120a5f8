mod common;

use common::food_log;
use genesis_application::ReconcileOutcome;
use genesis_application::selectors::{meal_totals, nutrition_totals};
use genesis_application::store::NutritionStore;
use genesis_core::nutrition::{FoodDraft, MacroTargets, MealType};
use genesis_core::{EntityId, GenesisError, UserId};
use genesis_infrastructure::{GatewayOp, InMemoryGateway};
use std::sync::Arc;

fn setup() -> (Arc<InMemoryGateway>, Arc<NutritionStore>, UserId) {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(NutritionStore::new(backend.clone(), MacroTargets::default()));
    (backend, store, UserId::new("user-1"))
}

fn salad() -> FoodDraft {
    FoodDraft::new("Salad", 200.0, 10.0, 20.0, 5.0)
}

#[tokio::test]
async fn test_fetch_buckets_logs_by_meal() {
    let (backend, store, user) = setup();
    backend.insert_food_log(food_log("a1", &user, "breakfast", 300.0, 0));

    store.fetch_today(&user).await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.meals.breakfast.len(), 1);
    assert_eq!(state.meals.breakfast[0].id, EntityId::new("a1"));
    assert_eq!(state.meals.breakfast[0].calories, 300.0);
    assert!(state.meals.lunch.is_empty());
    assert!(state.meals.dinner.is_empty());
    assert!(state.meals.snacks.is_empty());
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_add_without_user_stays_local() {
    let (backend, store, _) = setup();

    let submitted = store.add_food(MealType::Lunch, salad(), None);

    let id = submitted.id().cloned().unwrap();
    assert!(id.is_temporary());
    store.read(|state| {
        assert_eq!(state.meals.lunch.len(), 1);
        assert_eq!(state.meals.lunch[0].id, id);
        assert_eq!(nutrition_totals(state).calories, 200.0);
        assert_eq!(meal_totals(state, MealType::Lunch).protein, 10.0);
    });
    assert!(submitted.settled().await.is_none());
    assert_eq!(backend.calls(GatewayOp::CreateFoodLog), 0);
}

#[tokio::test]
async fn test_confirmed_create_keeps_its_position() {
    let (backend, store, user) = setup();
    backend.insert_food_log(food_log("a1", &user, "lunch", 150.0, 0));
    backend.insert_food_log(food_log("a2", &user, "lunch", 250.0, 1));
    store.fetch_today(&user).await.unwrap();

    let submitted = store.add_food(MealType::Lunch, salad(), Some(&user));
    let temp_id = submitted.id().cloned().unwrap();
    assert_eq!(store.read(|s| s.meals.lunch[2].id.clone()), temp_id);

    let (replaced, server_id) = match submitted.settled().await {
        Some(ReconcileOutcome::Replaced { temp_id, server_id }) => (temp_id, server_id),
        other => panic!("expected a replacement, got {other:?}"),
    };
    assert_eq!(replaced, temp_id);
    assert!(server_id.is_server());

    let ids: Vec<EntityId> = store.read(|s| s.meals.lunch.iter().map(|i| i.id.clone()).collect());
    assert_eq!(ids, vec![EntityId::new("a1"), EntityId::new("a2"), server_id.clone()]);
    assert!(backend.food_logs(&user).iter().any(|log| log.id == server_id));
    assert!(store.read(|s| s.pending.is_empty()));
}

#[tokio::test]
async fn test_failed_fetch_keeps_last_known_state() {
    let (backend, store, user) = setup();
    backend.insert_food_log(food_log("a1", &user, "dinner", 600.0, 0));
    backend.insert_targets(
        user.clone(),
        MacroTargets {
            calories: 1800.0,
            ..MacroTargets::default()
        },
    );
    store.fetch_all(&user).await.unwrap();
    let before = store.snapshot();

    backend.fail_next(GatewayOp::FoodLogsByDate, GenesisError::transport("network down"));
    let err = store.fetch_all(&user).await.unwrap_err();

    assert_eq!(err, GenesisError::transport("network down"));
    let after = store.snapshot();
    assert!(!after.is_loading);
    assert_eq!(after.error.as_deref(), Some("Transport error: network down"));
    assert_eq!(after.meals, before.meals);
    assert_eq!(after.targets, before.targets);
    assert_eq!(after.targets.calories, 1800.0);
}

#[tokio::test]
async fn test_removal_before_confirmation_is_not_resurrected() {
    let (backend, store, user) = setup();
    backend.hold(GatewayOp::CreateFoodLog);

    let submitted = store.add_food(MealType::Snacks, salad(), Some(&user));
    let temp_id = submitted.id().cloned().unwrap();
    backend.wait_for_calls(GatewayOp::CreateFoodLog, 1).await;

    let removal = store.remove_food(MealType::Snacks, temp_id.clone());
    assert!(removal.persist.is_none());
    assert!(store.read(|s| s.meals.is_empty()));

    backend.release(GatewayOp::CreateFoodLog);
    let outcome = submitted.settled().await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Orphaned { temp_id: t, .. } if t == temp_id));
    assert!(store.read(|s| s.meals.is_empty()));
    // The row the server created is deleted again.
    assert_eq!(backend.calls(GatewayOp::DeleteFoodLog), 1);
    assert!(backend.food_logs(&user).is_empty());
}

#[tokio::test]
async fn test_persist_failure_keeps_the_optimistic_item() {
    let (backend, store, user) = setup();
    backend.fail_next(GatewayOp::CreateFoodLog, GenesisError::transport("timeout"));

    let submitted = store.add_food(MealType::Breakfast, salad(), Some(&user));
    let temp_id = submitted.id().cloned().unwrap();
    let outcome = submitted.settled().await.unwrap();

    assert!(outcome.is_failed());
    store.read(|s| {
        assert_eq!(s.meals.breakfast[0].id, temp_id);
        assert_eq!(s.error.as_deref(), Some("Transport error: timeout"));
    });
}

#[tokio::test]
async fn test_clearing_an_empty_meal_twice() {
    let (backend, store, user) = setup();

    for _ in 0..2 {
        let outcome = store.clear_meal(MealType::Dinner, Some(&user)).settled().await;
        assert_eq!(outcome, Some(ReconcileOutcome::Acknowledged));
    }

    let state = store.snapshot();
    assert!(state.meals.dinner.is_empty());
    assert_eq!(state.error, None);
    assert_eq!(backend.calls(GatewayOp::ClearMeal), 2);
}

#[tokio::test]
async fn test_clear_meal_removes_server_rows() {
    let (backend, store, user) = setup();
    backend.insert_food_log(food_log("a1", &user, "lunch", 100.0, 0));
    backend.insert_food_log(food_log("a2", &user, "dinner", 100.0, 1));
    store.fetch_today(&user).await.unwrap();

    store.clear_meal(MealType::Lunch, Some(&user)).settled().await;

    assert!(store.read(|s| s.meals.lunch.is_empty()));
    assert_eq!(store.read(|s| s.meals.dinner.len()), 1);
    let remaining: Vec<_> = backend.food_logs(&user).into_iter().map(|log| log.id).collect();
    assert_eq!(remaining, vec![EntityId::new("a2")]);
}

#[tokio::test]
async fn test_completion_after_reset_is_ignored() {
    let (backend, store, user) = setup();
    backend.hold(GatewayOp::CreateFoodLog);

    let submitted = store.add_food(MealType::Lunch, salad(), Some(&user));
    backend.wait_for_calls(GatewayOp::CreateFoodLog, 1).await;
    store.reset();
    backend.release(GatewayOp::CreateFoodLog);

    assert_eq!(submitted.settled().await, Some(ReconcileOutcome::Stale));
    let state = store.snapshot();
    assert!(state.meals.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_totals_follow_every_change() {
    let (_, store, _) = setup();
    let breakfast = store.add_food(MealType::Breakfast, FoodDraft::new("Oats", 350.0, 12.0, 60.0, 6.0), None);
    store.add_food(MealType::Dinner, salad(), None);
    assert_eq!(store.read(nutrition_totals).calories, 550.0);

    store.remove_food(MealType::Breakfast, breakfast.id().cloned().unwrap());
    let totals = store.read(nutrition_totals);
    assert_eq!(totals.calories, 200.0);
    assert_eq!(totals.fat, 5.0);
}
