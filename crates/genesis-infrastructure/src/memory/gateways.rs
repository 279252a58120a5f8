//! Gateway trait implementations for [`InMemoryGateway`].

use super::{GatewayOp, InMemoryGateway};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use genesis_core::GenesisError;
use genesis_core::chat::{ChatGateway, Message, MessageRole, MessageType};
use genesis_core::date::{today, week_start};
use genesis_core::error::Result;
use genesis_core::mindfulness::{MindfulnessGateway, MindfulnessSession, SessionDraft};
use genesis_core::nutrition::{FoodLog, MacroTargets, MealType, NewFoodLog, NutritionGateway, TargetsPatch};
use genesis_core::profile::{Profile, ProfileGateway, ProfilePatch, Subscription};
use genesis_core::progress::{
    Badge, Checkin, CheckinDraft, CheckinGateway, CheckinType, CoachGateway, CoachNote, Streak, StreakType,
    WeightEntry,
};
use genesis_core::realtime::{EventSender, PushGateway, SubscriptionHandle, Topic};
use genesis_core::season::{Season, SeasonGateway, SeasonProgress, Workout, WorkoutWithExercises};
use genesis_core::{EntityId, UserId};

fn owned_by(owner: &Option<UserId>, user_id: &UserId) -> bool {
    owner.as_ref() == Some(user_id)
}

#[async_trait]
impl NutritionGateway for InMemoryGateway {
    async fn food_logs_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<FoodLog>> {
        self.enter(GatewayOp::FoodLogsByDate).await?;
        let mut logs: Vec<FoodLog> = self.with_tables(|t| {
            t.food_logs
                .iter()
                .filter(|log| owned_by(&log.user_id, user_id) && log.date == date)
                .cloned()
                .collect()
        });
        logs.sort_by_key(|log| log.created_at);
        Ok(logs)
    }

    async fn create_food_log(&self, user_id: &UserId, log: NewFoodLog) -> Result<FoodLog> {
        self.enter(GatewayOp::CreateFoodLog).await?;
        let row = FoodLog {
            id: EntityId::generate(),
            user_id: Some(user_id.clone()),
            date: log.date,
            meal_type: log.meal_type.as_str().to_string(),
            name: log.name,
            calories: log.calories,
            protein: log.protein,
            carbs: log.carbs,
            fat: log.fat,
            created_at: Some(Utc::now()),
        };
        self.with_tables(|t| t.food_logs.push(row.clone()));
        Ok(row)
    }

    async fn delete_food_log(&self, log_id: &EntityId) -> Result<()> {
        self.enter(GatewayOp::DeleteFoodLog).await?;
        self.with_tables(|t| t.food_logs.retain(|log| &log.id != log_id));
        Ok(())
    }

    async fn clear_meal(&self, user_id: &UserId, meal_type: MealType, date: NaiveDate) -> Result<()> {
        self.enter(GatewayOp::ClearMeal).await?;
        self.with_tables(|t| {
            t.food_logs.retain(|log| {
                !(owned_by(&log.user_id, user_id) && log.date == date && log.meal_type == meal_type.as_str())
            })
        });
        Ok(())
    }

    async fn targets(&self, user_id: &UserId) -> Result<Option<MacroTargets>> {
        self.enter(GatewayOp::Targets).await?;
        Ok(self.with_tables(|t| t.targets.get(user_id).copied()))
    }

    async fn upsert_targets(&self, user_id: &UserId, patch: TargetsPatch) -> Result<MacroTargets> {
        self.enter(GatewayOp::UpsertTargets).await?;
        Ok(self.with_tables(|t| {
            let targets = t.targets.entry(user_id.clone()).or_default();
            patch.apply(targets);
            *targets
        }))
    }
}

#[async_trait]
impl MindfulnessGateway for InMemoryGateway {
    async fn sessions_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<MindfulnessSession>> {
        self.enter(GatewayOp::SessionsByDate).await?;
        let mut sessions: Vec<MindfulnessSession> = self.with_tables(|t| {
            t.sessions
                .iter()
                .filter(|s| owned_by(&s.user_id, user_id) && s.date == date)
                .cloned()
                .collect()
        });
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn session_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<MindfulnessSession>> {
        self.enter(GatewayOp::SessionHistory).await?;
        let mut sessions: Vec<MindfulnessSession> = self.with_tables(|t| {
            t.sessions
                .iter()
                .filter(|s| owned_by(&s.user_id, user_id))
                .cloned()
                .collect()
        });
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn record_session(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        draft: SessionDraft,
    ) -> Result<MindfulnessSession> {
        self.enter(GatewayOp::RecordSession).await?;
        let mut session = draft.into_session(EntityId::generate(), Some(user_id.clone()), date);
        session.created_at = Some(Utc::now());
        self.with_tables(|t| t.sessions.push(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl ChatGateway for InMemoryGateway {
    async fn recent_messages(&self, user_id: &UserId, limit: usize) -> Result<Vec<Message>> {
        self.enter(GatewayOp::RecentMessages).await?;
        let mut messages = self.messages(user_id);
        messages.sort_by_key(|m| m.created_at);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    async fn messages_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<Vec<Message>> {
        self.enter(GatewayOp::MessagesSince).await?;
        let mut messages: Vec<Message> = self
            .messages(user_id)
            .into_iter()
            .filter(|m| m.created_at.is_some_and(|at| at >= since))
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn unread_count(&self, user_id: &UserId) -> Result<u32> {
        self.enter(GatewayOp::UnreadCount).await?;
        let count = self
            .messages(user_id)
            .iter()
            .filter(|m| m.is_unread_incoming())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn send_message(&self, user_id: &UserId, content: &str, message_type: MessageType) -> Result<Message> {
        self.enter(GatewayOp::SendMessage).await?;
        let message = Message {
            id: EntityId::generate(),
            user_id: Some(user_id.clone()),
            role: MessageRole::User,
            content: content.to_string(),
            message_type,
            is_coach_note: false,
            created_at: Some(Utc::now()),
            read_at: None,
        };
        // The insert is echoed to live channels like any other row.
        Ok(self.publish_message(message).await)
    }

    async fn mark_as_read(&self, user_id: &UserId) -> Result<()> {
        self.enter(GatewayOp::MarkAsRead).await?;
        let now = Utc::now();
        self.with_tables(|t| {
            t.messages
                .iter_mut()
                .filter(|m| owned_by(&m.user_id, user_id) && m.is_unread_incoming())
                .for_each(|m| m.read_at = Some(now));
        });
        Ok(())
    }
}

#[async_trait]
impl SeasonGateway for InMemoryGateway {
    async fn active_season(&self, user_id: &UserId) -> Result<Option<Season>> {
        self.enter(GatewayOp::ActiveSeason).await?;
        Ok(self.with_tables(|t| {
            t.seasons
                .iter()
                .find(|s| owned_by(&s.user_id, user_id) && s.status.as_deref() == Some("active"))
                .cloned()
        }))
    }

    async fn workout_on(&self, user_id: &UserId, date: NaiveDate) -> Result<Option<WorkoutWithExercises>> {
        self.enter(GatewayOp::WorkoutOn).await?;
        Ok(self.with_tables(|t| {
            t.workouts
                .iter()
                .find(|w| owned_by(&w.workout.user_id, user_id) && w.workout.scheduled_date == Some(date))
                .cloned()
        }))
    }

    async fn week_workouts(&self, user_id: &UserId, season_id: &EntityId, week: u32) -> Result<Vec<Workout>> {
        self.enter(GatewayOp::WeekWorkouts).await?;
        let mut workouts: Vec<Workout> = self.with_tables(|t| {
            t.workouts
                .iter()
                .map(|w| &w.workout)
                .filter(|w| {
                    owned_by(&w.user_id, user_id)
                        && w.season_id.as_ref() == Some(season_id)
                        && w.week_number == week
                })
                .cloned()
                .collect()
        });
        workouts.sort_by_key(|w| w.day_of_week);
        Ok(workouts)
    }

    async fn update_season_progress(&self, season_id: &EntityId, progress: SeasonProgress) -> Result<Season> {
        self.enter(GatewayOp::UpdateSeasonProgress).await?;
        self.with_tables(|t| -> Result<Season> {
            let season = t
                .seasons
                .iter_mut()
                .find(|s| &s.id == season_id)
                .ok_or_else(|| GenesisError::not_found("season", season_id.as_str()))?;
            progress.apply(season);
            season.updated_at = Some(Utc::now());
            Ok(season.clone())
        })
    }
}

#[async_trait]
impl CheckinGateway for InMemoryGateway {
    async fn checkin_on(&self, user_id: &UserId, kind: CheckinType, date: NaiveDate) -> Result<Option<Checkin>> {
        self.enter(GatewayOp::CheckinOn).await?;
        Ok(self.with_tables(|t| {
            t.checkins
                .iter()
                .find(|c| owned_by(&c.user_id, user_id) && c.kind == kind && c.date == date)
                .cloned()
        }))
    }

    async fn latest_weekly_checkin(&self, user_id: &UserId) -> Result<Option<Checkin>> {
        self.enter(GatewayOp::LatestWeeklyCheckin).await?;
        let monday = week_start(today());
        Ok(self.with_tables(|t| {
            t.checkins
                .iter()
                .filter(|c| owned_by(&c.user_id, user_id) && c.kind == CheckinType::Weekly && c.date >= monday)
                .max_by_key(|c| c.date)
                .cloned()
        }))
    }

    async fn upsert_checkin(
        &self,
        user_id: &UserId,
        kind: CheckinType,
        date: NaiveDate,
        draft: CheckinDraft,
    ) -> Result<Checkin> {
        self.enter(GatewayOp::UpsertCheckin).await?;
        Ok(self.with_tables(|t| {
            let existing = t
                .checkins
                .iter_mut()
                .find(|c| owned_by(&c.user_id, user_id) && c.kind == kind && c.date == date);
            match existing {
                Some(checkin) => {
                    checkin.answers = draft;
                    checkin.clone()
                }
                None => {
                    let mut checkin = draft.into_checkin(EntityId::generate(), user_id.clone(), kind, date);
                    checkin.created_at = Some(Utc::now());
                    t.checkins.push(checkin.clone());
                    checkin
                }
            }
        }))
    }

    async fn weight_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<WeightEntry>> {
        self.enter(GatewayOp::WeightHistory).await?;
        let mut weights: Vec<WeightEntry> = self.with_tables(|t| {
            t.checkins
                .iter()
                .filter(|c| owned_by(&c.user_id, user_id) && c.kind == CheckinType::Weekly)
                .filter_map(|c| {
                    c.answers.weight_kg.map(|weight_kg| WeightEntry {
                        date: c.date,
                        weight_kg,
                    })
                })
                .collect()
        });
        weights.sort_by(|a, b| b.date.cmp(&a.date));
        weights.truncate(limit);
        weights.reverse();
        Ok(weights)
    }
}

#[async_trait]
impl CoachGateway for InMemoryGateway {
    async fn streaks(&self, user_id: &UserId) -> Result<Vec<Streak>> {
        self.enter(GatewayOp::Streaks).await?;
        Ok(self.streaks_of(user_id))
    }

    async fn update_streak(&self, user_id: &UserId, kind: StreakType, today: NaiveDate) -> Result<Streak> {
        self.enter(GatewayOp::UpdateStreak).await?;
        Ok(self.with_tables(|t| {
            let existing = t
                .streaks
                .iter_mut()
                .find(|s| owned_by(&s.user_id, user_id) && s.streak_type == kind);
            match existing {
                Some(streak) => {
                    *streak = streak.advance(today, Utc::now());
                    streak.clone()
                }
                None => {
                    let streak = Streak::start(EntityId::generate(), user_id.clone(), kind, today);
                    t.streaks.push(streak.clone());
                    streak
                }
            }
        }))
    }

    async fn badges(&self, user_id: &UserId) -> Result<Vec<Badge>> {
        self.enter(GatewayOp::Badges).await?;
        let mut badges: Vec<Badge> = self.with_tables(|t| {
            t.badges
                .iter()
                .filter(|b| owned_by(&b.user_id, user_id))
                .cloned()
                .collect()
        });
        badges.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(badges)
    }

    async fn coach_notes(&self, user_id: &UserId, location: &str) -> Result<Vec<CoachNote>> {
        self.enter(GatewayOp::CoachNotes).await?;
        let now = Utc::now();
        let mut notes: Vec<CoachNote> = self.with_tables(|t| {
            t.coach_notes
                .iter()
                .filter(|n| owned_by(&n.user_id, user_id) && n.shows_on(location) && n.is_visible_at(now))
                .cloned()
                .collect()
        });
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn dismiss_coach_note(&self, note_id: &EntityId) -> Result<CoachNote> {
        self.enter(GatewayOp::DismissCoachNote).await?;
        self.with_tables(|t| -> Result<CoachNote> {
            let note = t
                .coach_notes
                .iter_mut()
                .find(|n| &n.id == note_id)
                .ok_or_else(|| GenesisError::not_found("coach_note", note_id.as_str()))?;
            note.dismissed_at = Some(Utc::now());
            Ok(note.clone())
        })
    }
}

#[async_trait]
impl ProfileGateway for InMemoryGateway {
    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.enter(GatewayOp::Profile).await?;
        Ok(self.profile_of(user_id))
    }

    async fn active_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>> {
        self.enter(GatewayOp::ActiveSubscription).await?;
        Ok(self.with_tables(|t| {
            t.subscriptions
                .iter()
                .find(|s| owned_by(&s.user_id, user_id) && s.status == "active")
                .cloned()
        }))
    }

    async fn update_profile(&self, user_id: &UserId, patch: ProfilePatch) -> Result<Profile> {
        self.enter(GatewayOp::UpdateProfile).await?;
        self.with_tables(|t| -> Result<Profile> {
            let profile = t
                .profiles
                .get_mut(user_id)
                .ok_or_else(|| GenesisError::not_found("profile", user_id.as_str()))?;
            patch.apply(profile);
            profile.updated_at = Some(Utc::now());
            Ok(profile.clone())
        })
    }
}

#[async_trait]
impl PushGateway for InMemoryGateway {
    async fn open(&self, topic: &Topic, events: EventSender) -> Result<SubscriptionHandle> {
        self.enter(GatewayOp::OpenChannel).await?;
        let handle = SubscriptionHandle::new(topic.clone());
        self.channels.lock().insert(handle.id, (topic.clone(), events));
        tracing::debug!(%topic, handle = %handle.id, "[InMemoryGateway] channel opened");
        Ok(handle)
    }

    async fn close(&self, handle: SubscriptionHandle) -> Result<()> {
        self.enter(GatewayOp::CloseChannel).await?;
        if self.channels.lock().remove(&handle.id).is_some() {
            tracing::debug!(topic = %handle.topic, handle = %handle.id, "[InMemoryGateway] channel closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn weekly(date: NaiveDate, weight_kg: Option<f64>) -> Checkin {
        CheckinDraft {
            weight_kg,
            ..Default::default()
        }
        .into_checkin(EntityId::generate(), user(), CheckinType::Weekly, date)
    }

    #[tokio::test]
    async fn test_clear_meal_only_touches_one_partition() {
        let gateway = InMemoryGateway::new();
        let date = today();
        for meal in [MealType::Lunch, MealType::Lunch, MealType::Dinner] {
            let log = NewFoodLog {
                meal_type: meal,
                date,
                name: "Rice".to_string(),
                calories: 200.0,
                protein: 4.0,
                carbs: 45.0,
                fat: 0.5,
            };
            gateway.create_food_log(&user(), log).await.unwrap();
        }

        gateway.clear_meal(&user(), MealType::Lunch, date).await.unwrap();

        let left = gateway.food_logs_by_date(&user(), date).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].meal_type, "dinner");
    }

    #[tokio::test]
    async fn test_upsert_checkin_keeps_one_row_per_day() {
        let gateway = InMemoryGateway::new();
        let date = today();
        let first = gateway
            .upsert_checkin(&user(), CheckinType::Daily, date, CheckinDraft::default())
            .await
            .unwrap();
        let second = gateway
            .upsert_checkin(
                &user(),
                CheckinType::Daily,
                date,
                CheckinDraft {
                    energy_level: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.answers.energy_level, Some(5));
        assert_eq!(gateway.checkins(&user()).len(), 1);
    }

    #[tokio::test]
    async fn test_weight_history_is_chronological_and_limited() {
        let gateway = InMemoryGateway::new();
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        for week in 0..4 {
            gateway.insert_checkin(weekly(start + Duration::weeks(week), Some(80.0 - week as f64)));
        }
        gateway.insert_checkin(weekly(start + Duration::weeks(4), None));

        let history = gateway.weight_history(&user(), 3).await.unwrap();

        let dates: Vec<NaiveDate> = history.iter().map(|w| w.date).collect();
        assert_eq!(
            dates,
            vec![start + Duration::weeks(1), start + Duration::weeks(2), start + Duration::weeks(3)]
        );
        assert_eq!(history[2].weight_kg, 77.0);
    }

    #[tokio::test]
    async fn test_latest_weekly_checkin_is_limited_to_this_week() {
        let gateway = InMemoryGateway::new();
        gateway.insert_checkin(weekly(week_start(today()) - Duration::days(1), Some(80.0)));
        assert_eq!(gateway.latest_weekly_checkin(&user()).await.unwrap(), None);

        gateway.insert_checkin(weekly(week_start(today()), Some(79.5)));
        let latest = gateway.latest_weekly_checkin(&user()).await.unwrap().unwrap();
        assert_eq!(latest.answers.weight_kg, Some(79.5));
    }

    #[tokio::test]
    async fn test_update_streak_starts_then_holds_for_the_day() {
        let gateway = InMemoryGateway::new();
        let day = today();

        let started = gateway.update_streak(&user(), StreakType::Checkin, day).await.unwrap();
        let again = gateway.update_streak(&user(), StreakType::Checkin, day).await.unwrap();

        assert_eq!(started.current_count, 1);
        assert_eq!(again.id, started.id);
        assert_eq!(again.current_count, 1);
        assert_eq!(gateway.streaks_of(&user()).len(), 1);
    }

    #[tokio::test]
    async fn test_dismissed_notes_are_hidden() {
        let gateway = InMemoryGateway::new();
        let note: CoachNote = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "user_id": "u1",
            "title": "Sleep",
            "content": "Aim for eight hours",
            "display_location": ["home"],
        }))
        .unwrap();
        gateway.insert_coach_note(note);

        assert_eq!(gateway.coach_notes(&user(), "home").await.unwrap().len(), 1);
        assert!(gateway.coach_notes(&user(), "train").await.unwrap().is_empty());

        gateway.dismiss_coach_note(&EntityId::new("n1")).await.unwrap();
        assert!(gateway.coach_notes(&user(), "home").await.unwrap().is_empty());
        assert!(matches!(
            gateway.dismiss_coach_note(&EntityId::new("missing")).await,
            Err(GenesisError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_recent_messages_are_the_newest_in_order() {
        let gateway = InMemoryGateway::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut message = Message::outgoing(EntityId::generate(), user(), format!("m{i}"));
            message.created_at = Some(base + Duration::seconds(i));
            gateway.insert_message(message);
        }

        let recent = gateway.recent_messages(&user(), 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);

        let since = gateway.messages_since(&user(), base + Duration::seconds(2)).await.unwrap();
        let contents: Vec<&str> = since.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }
}
