use super::summary;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use genesis_application::SyncContext;
use genesis_core::chat::{Message, MessageRole};
use genesis_core::config::GenesisConfig;
use genesis_core::date::{iso_day_of_week, today};
use genesis_core::mindfulness::SessionDraft;
use genesis_core::nutrition::{FoodDraft, MacroTargets, MealType};
use genesis_core::progress::CheckinDraft;
use genesis_core::season::{Season, SeasonPhase, Workout, WorkoutWithExercises};
use genesis_core::{EntityId, Gateways, UserId};
use genesis_infrastructure::{InMemoryGateway, WatchSessionProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::watch;

const DEMO_USER: &str = "demo-user";
const WAIT: StdDuration = StdDuration::from_secs(5);

pub async fn run(config: &GenesisConfig) -> Result<()> {
    let user = UserId::new(DEMO_USER);
    let backend = InMemoryGateway::shared();
    seed(&backend, &user)?;

    let ctx = SyncContext::new(Gateways::from_backend(backend.clone()), config);
    let session = Arc::new(WatchSessionProvider::default());
    let driver = ctx.orchestrator.spawn(session.clone());

    println!("Signing in as {user}...");
    session.sign_in(user.clone());
    let mut phase = ctx.orchestrator.phase_watch();
    tokio::time::timeout(WAIT, phase.wait_for(|p| p.is_ready()))
        .await
        .context("Timed out waiting for the initial load")?
        .context("Orchestrator stopped")?;
    summary::print(&ctx);

    println!();
    println!("Logging lunch, a breathing session and today's check-in...");
    let lunch = ctx.nutrition.add_food(
        MealType::Lunch,
        FoodDraft::new("Chicken bowl", 640.0, 48.0, 62.0, 18.0),
        Some(&user),
    );
    println!("  lunch shown immediately as {}", display_id(lunch.id()));
    let breathing = ctx.mindfulness.record_session(
        SessionDraft {
            session_id: "box-breathing".to_string(),
            session_title: "Box breathing".to_string(),
            duration_seconds: 300,
            completed: true,
            ..Default::default()
        },
        Some(&user),
    );
    let checkin = ctx.progress.submit_daily_checkin(
        &user,
        CheckinDraft {
            energy_level: Some(4),
            sleep_hours: Some(7.5),
            ..Default::default()
        },
    );
    let sent = ctx.chat.send_message(&user, "Done with today's session!");

    for (what, submitted) in [("lunch", lunch), ("session", breathing), ("check-in", checkin), ("message", sent)] {
        if let Some(outcome) = submitted.settled().await {
            println!("  {what}: {outcome:?}");
        }
    }

    println!();
    println!("Coach replies over the push channel...");
    let mut reply = Message::outgoing(EntityId::generate(), user.clone(), "Great work. Keep the protein up tonight.");
    reply.role = MessageRole::Coach;
    let reply = backend.publish_message(reply).await;
    let mut changes = ctx.chat.changes();
    wait_until(&mut changes, || {
        ctx.chat.read(|s| s.messages.iter().any(|m| m.id == reply.id))
    })
    .await?;

    let report = ctx.orchestrator.refresh().await?;
    println!("Refreshed {} stores, {} failed", report.outcomes.len(), report.failures().count());
    println!();
    summary::print(&ctx);

    println!();
    println!("Signing out...");
    session.sign_out();
    tokio::time::timeout(WAIT, phase.wait_for(|p| p.user_id().is_none()))
        .await
        .context("Timed out waiting for sign-out")?
        .context("Orchestrator stopped")?;
    println!(
        "Stores cleared: {}",
        ctx.nutrition.read(|s| s.meals.is_empty()) && ctx.chat.read(|s| s.messages.is_empty())
    );

    driver.abort();
    Ok(())
}

fn display_id(id: Option<&EntityId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

async fn wait_until(changes: &mut watch::Receiver<u64>, mut done: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT, async {
        while !done() {
            if changes.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .context("Timed out waiting for the store to update")
}

fn seed(backend: &InMemoryGateway, user: &UserId) -> Result<()> {
    let day = today();

    backend.insert_profile(serde_json::from_value(json!({
        "id": user,
        "email": "demo@genesis.invalid",
        "full_name": "Demo Athlete",
        "primary_goal": "recomposition",
        "onboarding_completed": true,
    }))?);
    backend.insert_subscription(serde_json::from_value(json!({
        "id": EntityId::generate(),
        "user_id": user,
        "plan": "hybrid_pro",
        "status": "active",
    }))?);
    backend.insert_targets(
        user.clone(),
        MacroTargets {
            calories: 2600.0,
            protein: 190.0,
            carbs: 280.0,
            fat: 75.0,
        },
    );

    let season_id = EntityId::generate();
    backend.insert_season(Season {
        id: season_id.clone(),
        user_id: Some(user.clone()),
        name: "Season 1".to_string(),
        number: 1,
        goal: "Build a strength base".to_string(),
        start_date: day - Duration::weeks(2),
        target_end_date: Some(day + Duration::weeks(10)),
        status: Some("active".to_string()),
        current_week: Some(3),
        current_phase: Some(SeasonPhase::Foundation),
        focus_areas: vec!["strength".to_string()],
        updated_at: None,
    });
    backend.insert_workout(WorkoutWithExercises {
        workout: Workout {
            id: EntityId::generate(),
            user_id: Some(user.clone()),
            season_id: Some(season_id),
            title: "Lower body A".to_string(),
            workout_type: Some("strength".to_string()),
            day_of_week: iso_day_of_week(day),
            week_number: 3,
            scheduled_date: Some(day),
            status: None,
            estimated_duration_minutes: Some(55),
            difficulty: Some(3),
            focus_muscles: vec!["quads".to_string(), "glutes".to_string()],
        },
        exercise_blocks: Vec::new(),
    });

    backend.insert_coach_note(serde_json::from_value(json!({
        "id": EntityId::generate(),
        "user_id": user,
        "title": "Deload next week",
        "content": "Keep the same lifts at 60% load.",
        "priority": "high",
        "display_location": ["home"],
        "created_at": Utc::now(),
    }))?);

    let mut welcome = Message::outgoing(EntityId::generate(), user.clone(), "Welcome to GENESIS.");
    welcome.role = MessageRole::Genesis;
    welcome.created_at = Some(Utc::now() - Duration::hours(1));
    backend.insert_message(welcome);
    Ok(())
}
