//! Progress store: check-ins, streaks, badges, coach notes and the weight chart.

use super::reconcile::remove_by_id;
use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use genesis_core::date::today;
use genesis_core::error::Result;
use genesis_core::progress::{
    Badge, Checkin, CheckinDraft, CheckinGateway, CheckinType, CoachGateway, CoachNote, Streak, StreakType,
    WeightEntry,
};
use genesis_core::{EntityId, UserId};
use std::sync::Arc;
use tokio::sync::watch;

const STORE: &str = "ProgressStore";

/// Screen whose coach notes the store keeps.
pub const HOME_LOCATION: &str = "home";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressState {
    pub today_checkin: Option<Checkin>,
    pub weekly_checkin: Option<Checkin>,
    pub streaks: Vec<Streak>,
    pub badges: Vec<Badge>,
    pub coach_notes: Vec<CoachNote>,
    pub weight_history: Vec<WeightEntry>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ProgressState {
    fn slot_mut(&mut self, kind: CheckinType) -> &mut Option<Checkin> {
        match kind {
            CheckinType::Daily => &mut self.today_checkin,
            CheckinType::Weekly => &mut self.weekly_checkin,
        }
    }
}

super::impl_has_status!(ProgressState);

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMutation {
    SubmitCheckin(Checkin),
    DismissCoachNote { id: EntityId },
}

impl ProgressMutation {
    /// Builds the optimistic check-in for today.
    ///
    /// Re-submitting a check-in the server already has keeps its id, since
    /// the upsert is keyed by (user, type, date).
    pub fn submit(state: &ProgressState, user_id: &UserId, kind: CheckinType, draft: CheckinDraft) -> Self {
        let date = today();
        let existing = match kind {
            CheckinType::Daily => state.today_checkin.as_ref(),
            CheckinType::Weekly => state.weekly_checkin.as_ref(),
        };
        let id = existing
            .filter(|checkin| checkin.date == date && checkin.id.is_server())
            .map(|checkin| checkin.id.clone())
            .unwrap_or_else(|| EntityId::temporary(kind.as_str()));
        ProgressMutation::SubmitCheckin(draft.into_checkin(id, user_id.clone(), kind, date))
    }
}

pub fn apply(state: &mut ProgressState, mutation: &ProgressMutation) -> LocalResult {
    match mutation {
        ProgressMutation::SubmitCheckin(checkin) => {
            *state.slot_mut(checkin.kind) = Some(checkin.clone());
            LocalResult::Applied(Some(checkin.id.clone()))
        }
        ProgressMutation::DismissCoachNote { id } => {
            if remove_by_id(&mut state.coach_notes, id) {
                LocalResult::Applied(Some(id.clone()))
            } else {
                LocalResult::Unchanged
            }
        }
    }
}

/// Takes the server's check-in into its slot when the slot still holds ours.
pub fn reconcile(mut state: ProgressState, outcome: &PersistOutcome<Checkin>) -> (ProgressState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Created { temp_id, record } => {
            let slot = state.slot_mut(record.kind);
            if slot.as_ref().is_some_and(|current| &current.id == temp_id) {
                *slot = Some(record.clone());
                ReconcileOutcome::Replaced {
                    temp_id: temp_id.clone(),
                    server_id: record.id.clone(),
                }
            } else {
                ReconcileOutcome::Acknowledged
            }
        }
        PersistOutcome::Saved(record) => {
            let slot = state.slot_mut(record.kind);
            if slot.as_ref().is_some_and(|current| current.id == record.id) {
                *slot = Some(record.clone());
            }
            ReconcileOutcome::Acknowledged
        }
        PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { error, .. } => record_failure(&mut state, error),
    };
    (state, result)
}

pub struct ProgressStore {
    cell: StoreCell<ProgressState>,
    checkins: Arc<dyn CheckinGateway>,
    coach: Arc<dyn CoachGateway>,
    weight_history_limit: usize,
}

impl ProgressStore {
    pub fn new(checkins: Arc<dyn CheckinGateway>, coach: Arc<dyn CoachGateway>, weight_history_limit: usize) -> Self {
        Self {
            cell: StoreCell::new(ProgressState::default()),
            checkins,
            coach,
            weight_history_limit,
        }
    }

    pub fn snapshot(&self) -> ProgressState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ProgressState) -> R) -> R {
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

    /// Runs the six progress reads concurrently and replaces the state with them.
    pub async fn fetch_all(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let (daily, weekly, streaks, badges, notes, weights) = tokio::join!(
            self.checkins.checkin_on(user_id, CheckinType::Daily, today()),
            self.checkins.latest_weekly_checkin(user_id),
            self.coach.streaks(user_id),
            self.coach.badges(user_id),
            self.coach.coach_notes(user_id, HOME_LOCATION),
            self.checkins.weight_history(user_id, self.weight_history_limit),
        );

        let result: Result<_> = (|| Ok((daily?, weekly?, streaks?, badges?, notes?, weights?)))();
        finish_load(
            &self.cell,
            STORE,
            generation,
            result,
            |state, (daily, weekly, streaks, badges, notes, weights)| {
                state.today_checkin = daily;
                state.weekly_checkin = weekly;
                state.streaks = streaks;
                state.badges = badges;
                state.coach_notes = notes;
                state.weight_history = weights;
            },
        )
    }

    pub fn apply_local(&self, mutation: &ProgressMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    /// Persists an applied mutation.
    ///
    /// A daily check-in then advances the check-in streak and refreshes the
    /// streaks; a weekly one carrying a weight refreshes the weight chart.
    pub fn schedule_persist(
        self: &Arc<Self>,
        mutation: ProgressMutation,
        user_id: Option<&UserId>,
    ) -> Option<PersistTask> {
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        match mutation {
            ProgressMutation::SubmitCheckin(checkin) => {
                let user_id = user_id?.clone();
                Some(PersistTask::spawn(async move {
                    let kind = checkin.kind;
                    let has_weight = checkin.answers.weight_kg.is_some();
                    let result = store
                        .checkins
                        .upsert_checkin(&user_id, kind, checkin.date, checkin.answers.clone())
                        .await;
                    let saved = result.is_ok();
                    let outcome = if checkin.id.is_temporary() {
                        PersistOutcome::from_create(checkin.id.clone(), result)
                    } else {
                        PersistOutcome::from_save(result)
                    };
                    let result = settle(&store.cell, STORE, generation, outcome, reconcile);

                    if saved && result != ReconcileOutcome::Stale {
                        match kind {
                            CheckinType::Daily => store.advance_checkin_streak(&user_id, generation).await,
                            CheckinType::Weekly if has_weight => {
                                store.refresh_weight_history(&user_id, generation).await
                            }
                            CheckinType::Weekly => {}
                        }
                    }
                    result
                }))
            }
            ProgressMutation::DismissCoachNote { id } => {
                if !id.is_server() {
                    return None;
                }
                Some(PersistTask::spawn(async move {
                    let result = store.coach.dismiss_coach_note(&id).await;
                    settle(&store.cell, STORE, generation, PersistOutcome::from_ack(result), reconcile)
                }))
            }
        }
    }

    pub fn submit_daily_checkin(self: &Arc<Self>, user_id: &UserId, draft: CheckinDraft) -> Submitted {
        self.submit_checkin(user_id, CheckinType::Daily, draft)
    }

    pub fn submit_weekly_checkin(self: &Arc<Self>, user_id: &UserId, draft: CheckinDraft) -> Submitted {
        self.submit_checkin(user_id, CheckinType::Weekly, draft)
    }

    pub fn dismiss_coach_note(self: &Arc<Self>, note_id: EntityId) -> Submitted {
        let mutation = ProgressMutation::DismissCoachNote { id: note_id };
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, None);
        Submitted { local, persist }
    }

    pub fn reset(&self) {
        self.cell.reset(ProgressState::default());
    }

    fn submit_checkin(self: &Arc<Self>, user_id: &UserId, kind: CheckinType, draft: CheckinDraft) -> Submitted {
        let (local, mutation) = self.cell.update(|state| {
            let mutation = ProgressMutation::submit(state, user_id, kind, draft);
            (apply(state, &mutation), mutation)
        });
        let persist = self.schedule_persist(mutation, Some(user_id));
        Submitted { local, persist }
    }

    async fn advance_checkin_streak(&self, user_id: &UserId, generation: u64) {
        if let Err(e) = self.coach.update_streak(user_id, StreakType::Checkin, today()).await {
            tracing::error!(%user_id, error = %e, "[ProgressStore] failed to update checkin streak");
            return;
        }
        match self.coach.streaks(user_id).await {
            Ok(streaks) => {
                self.cell.update_if_current(generation, |state| state.streaks = streaks);
            }
            Err(e) => tracing::error!(%user_id, error = %e, "[ProgressStore] failed to refresh streaks"),
        }
    }

    async fn refresh_weight_history(&self, user_id: &UserId, generation: u64) {
        match self.checkins.weight_history(user_id, self.weight_history_limit).await {
            Ok(weights) => {
                self.cell.update_if_current(generation, |state| state.weight_history = weights);
            }
            Err(e) => tracing::error!(%user_id, error = %e, "[ProgressStore] failed to refresh weight history"),
        }
    }
}
