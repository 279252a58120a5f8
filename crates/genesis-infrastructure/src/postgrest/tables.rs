//! Table-level queries behind each gateway trait.

use super::{Param, PostgrestGateway, eq};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use genesis_core::GenesisError;
use genesis_core::chat::{ChatGateway, Message, MessageType};
use genesis_core::date::{today, week_start};
use genesis_core::error::Result;
use genesis_core::mindfulness::{MindfulnessGateway, MindfulnessSession, SessionDraft};
use genesis_core::nutrition::{FoodLog, MacroTargets, MealType, NewFoodLog, NutritionGateway, TargetsPatch};
use genesis_core::profile::{Profile, ProfileGateway, ProfilePatch, Subscription};
use genesis_core::progress::{
    Badge, Checkin, CheckinDraft, CheckinGateway, CheckinType, CoachGateway, CoachNote, Streak, StreakType,
    WeightEntry,
};
use genesis_core::season::{Season, SeasonGateway, SeasonProgress, Workout, WorkoutWithExercises};
use genesis_core::{EntityId, UserId};
use serde::Serialize;
use serde_json::{Value, json};

const FOOD_LOGS: &str = "food_logs";
const NUTRITION_TARGETS: &str = "nutrition_targets";
const MINDFULNESS_SESSIONS: &str = "mindfulness_sessions";
const MESSAGES: &str = "messages";
const SEASONS: &str = "seasons";
const WORKOUTS: &str = "workouts";
const CHECKINS: &str = "checkins";
const STREAKS: &str = "streaks";
const BADGES: &str = "badges";
const COACH_NOTES: &str = "coach_notes";
const PROFILES: &str = "profiles";
const SUBSCRIPTIONS: &str = "subscriptions";

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serializes `payload` as an object and adds `extra` columns to it.
fn row(payload: &impl Serialize, extra: &[(&str, Value)]) -> Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| GenesisError::internal("row payload must serialize to an object"))?;
    for (key, column) in extra {
        object.insert((*key).to_string(), column.clone());
    }
    Ok(value)
}

fn user_filter(user_id: &UserId) -> Param {
    ("user_id", eq(user_id))
}

#[async_trait]
impl NutritionGateway for PostgrestGateway {
    async fn food_logs_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<FoodLog>> {
        self.select_many(
            FOOD_LOGS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("date", eq(date)),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }

    async fn create_food_log(&self, user_id: &UserId, log: NewFoodLog) -> Result<FoodLog> {
        let body = row(&log, &[("user_id", json!(user_id))])?;
        self.insert_one(FOOD_LOGS, &body).await
    }

    async fn delete_food_log(&self, log_id: &EntityId) -> Result<()> {
        self.delete(FOOD_LOGS, &[("id", eq(log_id))]).await
    }

    async fn clear_meal(&self, user_id: &UserId, meal_type: MealType, date: NaiveDate) -> Result<()> {
        self.delete(
            FOOD_LOGS,
            &[user_filter(user_id), ("date", eq(date)), ("meal_type", eq(meal_type))],
        )
        .await
    }

    async fn targets(&self, user_id: &UserId) -> Result<Option<MacroTargets>> {
        self.select_optional(NUTRITION_TARGETS, &[("select", "*".into()), user_filter(user_id)])
            .await
    }

    async fn upsert_targets(&self, user_id: &UserId, patch: TargetsPatch) -> Result<MacroTargets> {
        let body = row(&patch, &[("user_id", json!(user_id))])?;
        self.upsert_one(NUTRITION_TARGETS, "user_id", &body).await
    }
}

#[async_trait]
impl MindfulnessGateway for PostgrestGateway {
    async fn sessions_by_date(&self, user_id: &UserId, date: NaiveDate) -> Result<Vec<MindfulnessSession>> {
        self.select_many(
            MINDFULNESS_SESSIONS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("date", eq(date)),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn session_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<MindfulnessSession>> {
        self.select_many(
            MINDFULNESS_SESSIONS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("order", "created_at.desc".into()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn record_session(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        draft: SessionDraft,
    ) -> Result<MindfulnessSession> {
        let body = row(&draft, &[("user_id", json!(user_id)), ("date", json!(date))])?;
        self.insert_one(MINDFULNESS_SESSIONS, &body).await
    }
}

#[async_trait]
impl ChatGateway for PostgrestGateway {
    async fn recent_messages(&self, user_id: &UserId, limit: usize) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .select_many(
                MESSAGES,
                &[
                    ("select", "*".into()),
                    user_filter(user_id),
                    ("order", "created_at.desc".into()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        messages.reverse();
        Ok(messages)
    }

    async fn messages_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<Vec<Message>> {
        self.select_many(
            MESSAGES,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("created_at", format!("gte.{}", timestamp(since))),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }

    /// Errors read as zero unread messages; the count only drives a badge.
    async fn unread_count(&self, user_id: &UserId) -> Result<u32> {
        let filters = [user_filter(user_id), ("role", "neq.user".into()), ("read_at", "is.null".into())];
        match self.count(MESSAGES, &filters).await {
            Ok(count) => Ok(count),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "[PostgrestGateway] unread count unavailable");
                Ok(0)
            }
        }
    }

    async fn send_message(&self, user_id: &UserId, content: &str, message_type: MessageType) -> Result<Message> {
        let body = json!({
            "user_id": user_id,
            "role": "user",
            "content": content,
            "message_type": message_type,
        });
        self.insert_one(MESSAGES, &body).await
    }

    async fn mark_as_read(&self, user_id: &UserId) -> Result<()> {
        self.update_many(
            MESSAGES,
            &[user_filter(user_id), ("role", "neq.user".into()), ("read_at", "is.null".into())],
            &json!({ "read_at": timestamp(Utc::now()) }),
        )
        .await
    }
}

#[async_trait]
impl SeasonGateway for PostgrestGateway {
    async fn active_season(&self, user_id: &UserId) -> Result<Option<Season>> {
        self.select_optional(
            SEASONS,
            &[("select", "*".into()), user_filter(user_id), ("status", eq("active"))],
        )
        .await
    }

    async fn workout_on(&self, user_id: &UserId, date: NaiveDate) -> Result<Option<WorkoutWithExercises>> {
        self.select_optional(
            WORKOUTS,
            &[
                ("select", "*,exercise_blocks(*)".into()),
                user_filter(user_id),
                ("scheduled_date", eq(date)),
            ],
        )
        .await
    }

    async fn week_workouts(&self, user_id: &UserId, season_id: &EntityId, week: u32) -> Result<Vec<Workout>> {
        self.select_many(
            WORKOUTS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("season_id", eq(season_id)),
                ("week_number", eq(week)),
                ("order", "day_of_week.asc".into()),
            ],
        )
        .await
    }

    async fn update_season_progress(&self, season_id: &EntityId, progress: SeasonProgress) -> Result<Season> {
        self.update_one(SEASONS, &[("id", eq(season_id))], &progress).await
    }
}

#[async_trait]
impl CheckinGateway for PostgrestGateway {
    async fn checkin_on(&self, user_id: &UserId, kind: CheckinType, date: NaiveDate) -> Result<Option<Checkin>> {
        self.select_optional(
            CHECKINS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("type", eq(kind.as_str())),
                ("date", eq(date)),
            ],
        )
        .await
    }

    async fn latest_weekly_checkin(&self, user_id: &UserId) -> Result<Option<Checkin>> {
        self.select_optional(
            CHECKINS,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("type", eq(CheckinType::Weekly.as_str())),
                ("date", format!("gte.{}", week_start(today()))),
                ("order", "date.desc".into()),
                ("limit", "1".into()),
            ],
        )
        .await
    }

    async fn upsert_checkin(
        &self,
        user_id: &UserId,
        kind: CheckinType,
        date: NaiveDate,
        draft: CheckinDraft,
    ) -> Result<Checkin> {
        let body = row(
            &draft,
            &[("user_id", json!(user_id)), ("type", json!(kind)), ("date", json!(date))],
        )?;
        self.upsert_one(CHECKINS, "user_id,type,date", &body).await
    }

    async fn weight_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<WeightEntry>> {
        let mut weights: Vec<WeightEntry> = self
            .select_many(
                CHECKINS,
                &[
                    ("select", "date,weight_kg".into()),
                    user_filter(user_id),
                    ("type", eq(CheckinType::Weekly.as_str())),
                    ("weight_kg", "not.is.null".into()),
                    ("order", "date.desc".into()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        weights.reverse();
        Ok(weights)
    }
}

#[async_trait]
impl CoachGateway for PostgrestGateway {
    async fn streaks(&self, user_id: &UserId) -> Result<Vec<Streak>> {
        self.select_many(STREAKS, &[("select", "*".into()), user_filter(user_id)]).await
    }

    async fn update_streak(&self, user_id: &UserId, kind: StreakType, today: NaiveDate) -> Result<Streak> {
        let existing: Option<Streak> = self
            .select_optional(
                STREAKS,
                &[("select", "*".into()), user_filter(user_id), ("streak_type", eq(kind))],
            )
            .await?;

        match existing {
            Some(streak) if streak.last_activity_date == Some(today) => Ok(streak),
            Some(streak) => {
                let next = streak.advance(today, Utc::now());
                let body = json!({
                    "current_count": next.current_count,
                    "longest_count": next.longest_count,
                    "last_activity_date": next.last_activity_date,
                    "streak_started_at": next.streak_started_at,
                });
                self.update_one(STREAKS, &[("id", eq(&streak.id))], &body).await
            }
            None => {
                let body = json!({
                    "user_id": user_id,
                    "streak_type": kind,
                    "current_count": 1,
                    "longest_count": 1,
                    "last_activity_date": today,
                    "streak_started_at": today,
                });
                self.insert_one(STREAKS, &body).await
            }
        }
    }

    async fn badges(&self, user_id: &UserId) -> Result<Vec<Badge>> {
        self.select_many(
            BADGES,
            &[("select", "*".into()), user_filter(user_id), ("order", "earned_at.desc".into())],
        )
        .await
    }

    async fn coach_notes(&self, user_id: &UserId, location: &str) -> Result<Vec<CoachNote>> {
        let now = timestamp(Utc::now());
        self.select_many(
            COACH_NOTES,
            &[
                ("select", "*".into()),
                user_filter(user_id),
                ("is_active", eq(true)),
                ("dismissed_at", "is.null".into()),
                ("display_location", format!("cs.{{{location}}}")),
                ("or", format!("(show_until.is.null,show_until.gt.{now})")),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn dismiss_coach_note(&self, note_id: &EntityId) -> Result<CoachNote> {
        self.update_one(
            COACH_NOTES,
            &[("id", eq(note_id))],
            &json!({ "dismissed_at": timestamp(Utc::now()) }),
        )
        .await
    }
}

#[async_trait]
impl ProfileGateway for PostgrestGateway {
    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.select_optional(PROFILES, &[("select", "*".into()), ("id", eq(user_id))]).await
    }

    async fn active_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>> {
        self.select_optional(
            SUBSCRIPTIONS,
            &[("select", "*".into()), user_filter(user_id), ("status", eq("active"))],
        )
        .await
    }

    async fn update_profile(&self, user_id: &UserId, patch: ProfilePatch) -> Result<Profile> {
        self.update_one(PROFILES, &[("id", eq(user_id))], &patch).await
    }
}
