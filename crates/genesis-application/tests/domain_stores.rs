mod common;

use chrono::Duration;
use genesis_application::ReconcileOutcome;
use genesis_application::selectors::{
    current_phase, current_week, has_completed_mindfulness_today, has_today_checkin, is_hybrid_plan,
    onboarding_completed, streak_of, todays_mindfulness_count,
};
use genesis_application::store::{MindfulnessStore, ProfileStore, ProgressStore, SeasonStore};
use genesis_core::date::today;
use genesis_core::mindfulness::SessionDraft;
use genesis_core::profile::ProfilePatch;
use genesis_core::progress::{CheckinDraft, StreakType};
use genesis_core::season::{Season, SeasonPhase};
use genesis_core::{EntityId, GenesisError, UserId};
use genesis_infrastructure::{GatewayOp, InMemoryGateway};
use serde_json::json;
use std::sync::Arc;

fn user() -> UserId {
    UserId::new("user-1")
}

fn breathing(completed: bool) -> SessionDraft {
    SessionDraft {
        session_id: "box-breathing".to_string(),
        session_title: "Box breathing".to_string(),
        duration_seconds: 300,
        completed,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_recorded_session_is_visible_then_confirmed() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(MindfulnessStore::new(backend.clone(), backend.clone(), 30));
    let user = user();

    let submitted = store.record_session(breathing(true), Some(&user));
    let temp_id = submitted.id().cloned().unwrap();
    store.read(|s| {
        assert_eq!(s.today_sessions[0].id, temp_id);
        assert_eq!(s.session_history[0].id, temp_id);
        assert_eq!(todays_mindfulness_count(s), 1);
        assert!(has_completed_mindfulness_today(s, today()));
    });

    let outcome = submitted.settled().await.unwrap();
    let server_id = match outcome {
        ReconcileOutcome::Replaced { server_id, .. } => server_id,
        other => panic!("expected a replacement, got {other:?}"),
    };
    store.read(|s| {
        assert_eq!(s.today_sessions[0].id, server_id);
        assert_eq!(s.session_history[0].id, server_id);
    });
    // A completed session advances the mindfulness streak.
    let streaks = backend.streaks_of(&user);
    assert_eq!(streaks.len(), 1);
    assert_eq!(streaks[0].streak_type, StreakType::Mindfulness);
    assert_eq!(streaks[0].current_count, 1);
}

#[tokio::test]
async fn test_unfinished_session_does_not_touch_the_streak() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(MindfulnessStore::new(backend.clone(), backend.clone(), 30));
    let user = user();

    store.record_session(breathing(false), Some(&user)).settled().await;

    assert!(!store.read(|s| has_completed_mindfulness_today(s, today())));
    assert_eq!(backend.calls(GatewayOp::UpdateStreak), 0);
}

#[tokio::test]
async fn test_daily_checkin_resubmission_updates_one_row() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(ProgressStore::new(backend.clone(), backend.clone(), 12));
    let user = user();

    let first = store.submit_daily_checkin(
        &user,
        CheckinDraft {
            energy_level: Some(3),
            ..Default::default()
        },
    );
    assert!(store.read(has_today_checkin));
    first.settled().await;
    let server_id = store.read(|s| s.today_checkin.as_ref().map(|c| c.id.clone())).unwrap();
    assert!(server_id.is_server());

    store
        .submit_daily_checkin(
            &user,
            CheckinDraft {
                energy_level: Some(5),
                ..Default::default()
            },
        )
        .settled()
        .await;

    let checkins = backend.checkins(&user);
    assert_eq!(checkins.len(), 1);
    assert_eq!(checkins[0].answers.energy_level, Some(5));
    store.read(|s| {
        let checkin = s.today_checkin.as_ref().unwrap();
        assert_eq!(checkin.id, server_id);
        assert_eq!(checkin.answers.energy_level, Some(5));
        // The check-in streak was advanced once for the day and reloaded.
        assert_eq!(streak_of(s, StreakType::Checkin).map(|st| st.current_count), Some(1));
    });
}

#[tokio::test]
async fn test_weekly_checkin_with_weight_refreshes_the_chart() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(ProgressStore::new(backend.clone(), backend.clone(), 12));
    let user = user();

    store
        .submit_weekly_checkin(
            &user,
            CheckinDraft {
                weight_kg: Some(81.4),
                ..Default::default()
            },
        )
        .settled()
        .await;

    store.read(|s| {
        assert!(s.weekly_checkin.as_ref().is_some_and(|c| c.id.is_server()));
        assert_eq!(s.weight_history.len(), 1);
        assert_eq!(s.weight_history[0].weight_kg, 81.4);
    });
}

#[tokio::test]
async fn test_dismissed_note_is_removed_locally_and_remotely() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(ProgressStore::new(backend.clone(), backend.clone(), 12));
    let user = user();
    let note_id = EntityId::generate();
    backend.insert_coach_note(
        serde_json::from_value(json!({
            "id": note_id,
            "user_id": user,
            "title": "Deload",
            "content": "Take it easy this week.",
            "display_location": ["home"],
        }))
        .unwrap(),
    );
    store.fetch_all(&user).await.unwrap();
    assert_eq!(store.read(|s| s.coach_notes.len()), 1);

    let outcome = store.dismiss_coach_note(note_id).settled().await;

    assert_eq!(outcome, Some(ReconcileOutcome::Acknowledged));
    assert!(store.read(|s| s.coach_notes.is_empty()));
    store.fetch_all(&user).await.unwrap();
    assert!(store.read(|s| s.coach_notes.is_empty()));
}

fn active_season(user: &UserId) -> Season {
    Season {
        id: EntityId::generate(),
        user_id: Some(user.clone()),
        name: "Season 1".to_string(),
        number: 1,
        goal: "Build a base".to_string(),
        start_date: today() - Duration::weeks(1),
        target_end_date: None,
        status: Some("active".to_string()),
        current_week: Some(2),
        current_phase: Some(SeasonPhase::Foundation),
        focus_areas: Vec::new(),
        updated_at: None,
    }
}

#[tokio::test]
async fn test_season_progress_is_applied_then_saved() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(SeasonStore::new(backend.clone()));
    let user = user();
    let season = active_season(&user);
    backend.insert_season(season.clone());
    store.fetch_all(&user).await.unwrap();
    assert_eq!(store.read(current_week), 2);

    let submitted = store.update_season_progress(5, SeasonPhase::Construction, Some(&user));
    assert_eq!(store.read(current_week), 5);
    assert_eq!(store.read(current_phase), SeasonPhase::Construction);
    assert_eq!(submitted.settled().await, Some(ReconcileOutcome::Acknowledged));

    let saved = backend.season(&season.id).unwrap();
    assert_eq!(saved.current_week, Some(5));
    assert_eq!(saved.current_phase, Some(SeasonPhase::Construction));
}

#[tokio::test]
async fn test_season_progress_without_a_season_is_unchanged() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(SeasonStore::new(backend.clone()));

    let submitted = store.update_season_progress(3, SeasonPhase::Optimization, Some(&user()));

    assert!(submitted.persist.is_none());
    assert_eq!(backend.calls(GatewayOp::UpdateSeasonProgress), 0);
}

#[tokio::test]
async fn test_onboarding_completion_round_trips_through_the_profile() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(ProfileStore::new(backend.clone()));
    let user = user();
    backend.insert_profile(
        serde_json::from_value(json!({ "id": user, "email": "athlete@genesis.invalid" })).unwrap(),
    );
    backend.insert_subscription(
        serde_json::from_value(json!({
            "id": EntityId::generate(),
            "user_id": user,
            "plan": "hybrid_basic",
            "status": "active",
        }))
        .unwrap(),
    );
    store.fetch_profile(&user).await.unwrap();
    assert!(store.read(is_hybrid_plan));
    assert!(!store.read(onboarding_completed));

    let submitted = store.complete_onboarding(
        &user,
        ProfilePatch {
            primary_goal: Some("strength".to_string()),
            ..Default::default()
        },
    );
    assert!(store.read(onboarding_completed));
    assert_eq!(submitted.settled().await, Some(ReconcileOutcome::Acknowledged));

    let saved = backend.profile_of(&user).unwrap();
    assert!(saved.onboarding_completed);
    assert_eq!(saved.primary_goal.as_deref(), Some("strength"));
}

#[tokio::test]
async fn test_failed_profile_save_keeps_the_local_edit() {
    let backend = InMemoryGateway::shared();
    let store = Arc::new(ProfileStore::new(backend.clone()));
    let user = user();
    backend.insert_profile(
        serde_json::from_value(json!({ "id": user, "email": "athlete@genesis.invalid" })).unwrap(),
    );
    store.fetch_profile(&user).await.unwrap();
    backend.fail_next(GatewayOp::UpdateProfile, GenesisError::transport("offline"));

    let outcome = store
        .update_profile(
            &user,
            ProfilePatch {
                full_name: Some("Sam".to_string()),
                ..Default::default()
            },
        )
        .settled()
        .await;

    assert!(outcome.is_some_and(|o| o.is_failed()));
    store.read(|s| {
        assert_eq!(s.profile.as_ref().and_then(|p| p.full_name.as_deref()), Some("Sam"));
        assert!(s.error.is_some());
    });
}
