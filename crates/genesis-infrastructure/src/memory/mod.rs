//! In-process backend.
//!
//! `InMemoryGateway` implements every gateway trait over plain tables held
//! in memory. It assigns UUIDs and timestamps like the server does, pushes
//! inserted messages to open channels, and exposes hooks to inject failures,
//! delay or hold calls, and count them.

mod gateways;

use genesis_core::GenesisError;
use genesis_core::chat::Message;
use genesis_core::error::Result;
use genesis_core::mindfulness::MindfulnessSession;
use genesis_core::nutrition::{FoodLog, MacroTargets};
use genesis_core::profile::{Profile, Subscription};
use genesis_core::progress::{Badge, Checkin, CoachNote, Streak};
use genesis_core::realtime::{ChannelKind, EventSender, PushEvent, Topic};
use genesis_core::season::{Season, WorkoutWithExercises};
use genesis_core::{EntityId, UserId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Every operation of the gateway, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    FoodLogsByDate,
    CreateFoodLog,
    DeleteFoodLog,
    ClearMeal,
    Targets,
    UpsertTargets,
    SessionsByDate,
    SessionHistory,
    RecordSession,
    RecentMessages,
    MessagesSince,
    UnreadCount,
    SendMessage,
    MarkAsRead,
    ActiveSeason,
    WorkoutOn,
    WeekWorkouts,
    UpdateSeasonProgress,
    CheckinOn,
    LatestWeeklyCheckin,
    UpsertCheckin,
    WeightHistory,
    Streaks,
    UpdateStreak,
    Badges,
    CoachNotes,
    DismissCoachNote,
    Profile,
    ActiveSubscription,
    UpdateProfile,
    OpenChannel,
    CloseChannel,
}

/// The backend's rows.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub food_logs: Vec<FoodLog>,
    pub targets: HashMap<UserId, MacroTargets>,
    pub sessions: Vec<MindfulnessSession>,
    pub messages: Vec<Message>,
    pub seasons: Vec<Season>,
    pub workouts: Vec<WorkoutWithExercises>,
    pub checkins: Vec<Checkin>,
    pub streaks: Vec<Streak>,
    pub badges: Vec<Badge>,
    pub coach_notes: Vec<CoachNote>,
    pub profiles: HashMap<UserId, Profile>,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    faults: Mutex<HashMap<GatewayOp, VecDeque<GenesisError>>>,
    calls: Mutex<HashMap<GatewayOp, usize>>,
    delay: Mutex<Option<Duration>>,
    holds: Mutex<HashMap<GatewayOp, Arc<Semaphore>>>,
    channels: Mutex<HashMap<Uuid, (Topic, EventSender)>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // --- Test hooks ---------------------------------------------------------

    /// Makes the next call of `op` fail with `error`. Queued errors are used in order.
    pub fn fail_next(&self, op: GatewayOp, error: GenesisError) {
        self.faults.lock().entry(op).or_default().push_back(error);
    }

    /// Delays every call by `delay` (`None` removes the delay).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Holds calls of `op` until [`release`](Self::release).
    pub fn hold(&self, op: GatewayOp) {
        self.holds.lock().entry(op).or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Lets every held call of `op` proceed.
    pub fn release(&self, op: GatewayOp) {
        if let Some(gate) = self.holds.lock().remove(&op) {
            gate.close();
        }
    }

    pub fn calls(&self, op: GatewayOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Waits until `op` has been called at least `count` times.
    pub async fn wait_for_calls(&self, op: GatewayOp, count: usize) {
        while self.calls(op) < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    // --- Push ---------------------------------------------------------------

    /// Inserts a server-originated message and pushes it to the user's channels.
    pub async fn publish_message(&self, mut message: Message) -> Message {
        if message.id.is_temporary() {
            message.id = EntityId::generate();
        }
        if message.created_at.is_none() {
            message.created_at = Some(chrono::Utc::now());
        }
        {
            let mut tables = self.tables.lock();
            match tables.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message.clone(),
                None => tables.messages.push(message.clone()),
            }
        }
        if let Some(user_id) = message.user_id.clone() {
            self.push(
                &user_id,
                PushEvent::MessageInserted {
                    message: message.clone(),
                },
            )
            .await;
        }
        message
    }

    /// Delivers `event` to every open channel of `user_id`, without touching the tables.
    pub async fn push(&self, user_id: &UserId, event: PushEvent) {
        let senders: Vec<(Uuid, EventSender)> = self
            .channels
            .lock()
            .iter()
            .filter(|(_, (topic, _))| &topic.user_id == user_id && topic.kind == ChannelKind::Messages)
            .map(|(id, (_, sender))| (*id, sender.clone()))
            .collect();

        for (id, sender) in senders {
            if sender.send(event.clone()).await.is_err() {
                tracing::debug!(%id, "[InMemoryGateway] channel receiver gone, dropping it");
                self.channels.lock().remove(&id);
            }
        }
    }

    /// Drops every open channel, as a lost connection would.
    pub fn drop_channels(&self) {
        self.channels.lock().clear();
    }

    pub fn open_channels(&self) -> usize {
        self.channels.lock().len()
    }

    // --- Seeding and inspection ----------------------------------------------

    pub fn insert_food_log(&self, log: FoodLog) {
        self.tables.lock().food_logs.push(log);
    }

    pub fn insert_targets(&self, user_id: UserId, targets: MacroTargets) {
        self.tables.lock().targets.insert(user_id, targets);
    }

    pub fn insert_session(&self, session: MindfulnessSession) {
        self.tables.lock().sessions.push(session);
    }

    pub fn insert_message(&self, message: Message) {
        self.tables.lock().messages.push(message);
    }

    pub fn insert_season(&self, season: Season) {
        self.tables.lock().seasons.push(season);
    }

    pub fn insert_workout(&self, workout: WorkoutWithExercises) {
        self.tables.lock().workouts.push(workout);
    }

    pub fn insert_checkin(&self, checkin: Checkin) {
        self.tables.lock().checkins.push(checkin);
    }

    pub fn insert_streak(&self, streak: Streak) {
        self.tables.lock().streaks.push(streak);
    }

    pub fn insert_badge(&self, badge: Badge) {
        self.tables.lock().badges.push(badge);
    }

    pub fn insert_coach_note(&self, note: CoachNote) {
        self.tables.lock().coach_notes.push(note);
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.tables.lock().profiles.insert(profile.id.clone(), profile);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.tables.lock().subscriptions.push(subscription);
    }

    pub fn food_logs(&self, user_id: &UserId) -> Vec<FoodLog> {
        self.tables
            .lock()
            .food_logs
            .iter()
            .filter(|log| log.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn messages(&self, user_id: &UserId) -> Vec<Message> {
        self.tables
            .lock()
            .messages
            .iter()
            .filter(|m| m.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn streaks_of(&self, user_id: &UserId) -> Vec<Streak> {
        self.tables
            .lock()
            .streaks
            .iter()
            .filter(|s| s.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn checkins(&self, user_id: &UserId) -> Vec<Checkin> {
        self.tables
            .lock()
            .checkins
            .iter()
            .filter(|c| c.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn profile_of(&self, user_id: &UserId) -> Option<Profile> {
        self.tables.lock().profiles.get(user_id).cloned()
    }

    pub fn season(&self, season_id: &EntityId) -> Option<Season> {
        self.tables.lock().seasons.iter().find(|s| &s.id == season_id).cloned()
    }

    // --- Internals ------------------------------------------------------------

    /// Entry point of every call: counts it, honours holds and delay, then
    /// pops an injected failure if one is queued.
    async fn enter(&self, op: GatewayOp) -> Result<()> {
        *self.calls.lock().entry(op).or_default() += 1;

        let gate = self.holds.lock().get(&op).cloned();
        if let Some(gate) = gate {
            // Closed on release; acquiring never succeeds otherwise.
            let _ = gate.acquire().await;
        }

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.faults.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => {
                tracing::debug!(?op, error = %error, "[InMemoryGateway] injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        f(&mut self.tables.lock())
    }
}
