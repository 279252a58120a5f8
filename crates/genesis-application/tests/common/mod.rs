//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use genesis_application::SyncContext;
use genesis_core::chat::{Message, MessageRole, MessageType};
use genesis_core::config::GenesisConfig;
use genesis_core::date::today;
use genesis_core::nutrition::FoodLog;
use genesis_core::{EntityId, Gateways, UserId};
use genesis_infrastructure::InMemoryGateway;
use std::sync::Arc;
use std::time::Duration;

pub fn context(backend: &Arc<InMemoryGateway>) -> SyncContext {
    SyncContext::new(Gateways::from_backend(backend.clone()), &GenesisConfig::default())
}

/// A food log dated today, `offset_secs` after now so seeded rows keep their order.
pub fn food_log(id: &str, user: &UserId, meal: &str, calories: f64, offset_secs: i64) -> FoodLog {
    FoodLog {
        id: EntityId::new(id),
        user_id: Some(user.clone()),
        date: today(),
        meal_type: meal.to_string(),
        name: format!("food {id}"),
        calories,
        protein: 10.0,
        carbs: 20.0,
        fat: 5.0,
        created_at: Some(Utc::now() + ChronoDuration::seconds(offset_secs)),
    }
}

/// An unread message from GENESIS.
pub fn coach_message(id: &str, user: &UserId, content: &str) -> Message {
    Message {
        id: EntityId::new(id),
        user_id: Some(user.clone()),
        role: MessageRole::Genesis,
        content: content.to_string(),
        message_type: MessageType::Text,
        is_coach_note: false,
        created_at: Some(Utc::now()),
        read_at: None,
    }
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}
