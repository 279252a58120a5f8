//! Mindfulness store: today's sessions and recent history, newest first.

use super::reconcile::replace_in_place;
use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use genesis_core::date::today;
use genesis_core::error::Result;
use genesis_core::mindfulness::{MindfulnessGateway, MindfulnessSession, SessionDraft};
use genesis_core::progress::{CoachGateway, StreakType};
use genesis_core::{EntityId, UserId};
use std::sync::Arc;
use tokio::sync::watch;

const STORE: &str = "MindfulnessStore";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MindfulnessState {
    pub today_sessions: Vec<MindfulnessSession>,
    pub session_history: Vec<MindfulnessSession>,
    pub is_loading: bool,
    pub error: Option<String>,
}

super::impl_has_status!(MindfulnessState);

#[derive(Debug, Clone, PartialEq)]
pub enum MindfulnessMutation {
    RecordSession(MindfulnessSession),
}

impl MindfulnessMutation {
    pub fn record(draft: SessionDraft, user_id: Option<&UserId>) -> Self {
        let session = draft.into_session(EntityId::temporary("mind"), user_id.cloned(), today());
        MindfulnessMutation::RecordSession(session)
    }
}

pub fn apply(state: &mut MindfulnessState, mutation: &MindfulnessMutation) -> LocalResult {
    match mutation {
        MindfulnessMutation::RecordSession(session) => {
            state.today_sessions.insert(0, session.clone());
            state.session_history.insert(0, session.clone());
            LocalResult::Applied(Some(session.id.clone()))
        }
    }
}

/// Swaps the temporary session for the recorded one in both lists.
pub fn reconcile(
    mut state: MindfulnessState,
    outcome: &PersistOutcome<MindfulnessSession>,
) -> (MindfulnessState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Created { temp_id, record } => {
            let in_today = replace_in_place(&mut state.today_sessions, temp_id, record);
            let in_history = replace_in_place(&mut state.session_history, temp_id, record);
            if in_today || in_history {
                ReconcileOutcome::Replaced {
                    temp_id: temp_id.clone(),
                    server_id: record.id.clone(),
                }
            } else {
                ReconcileOutcome::Acknowledged
            }
        }
        PersistOutcome::Saved(_) | PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { error, .. } => record_failure(&mut state, error),
    };
    (state, result)
}

pub struct MindfulnessStore {
    cell: StoreCell<MindfulnessState>,
    gateway: Arc<dyn MindfulnessGateway>,
    coach: Arc<dyn CoachGateway>,
    history_limit: usize,
}

impl MindfulnessStore {
    pub fn new(gateway: Arc<dyn MindfulnessGateway>, coach: Arc<dyn CoachGateway>, history_limit: usize) -> Self {
        Self {
            cell: StoreCell::new(MindfulnessState::default()),
            gateway,
            coach,
            history_limit,
        }
    }

    pub fn snapshot(&self) -> MindfulnessState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&MindfulnessState) -> R) -> R {
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

    /// Refreshes today's sessions only. Failures are logged.
    pub async fn fetch_today(&self, user_id: &UserId) -> Result<()> {
        let generation = self.cell.generation();
        let sessions = self.gateway.sessions_by_date(user_id, today()).await.inspect_err(|e| {
            tracing::error!(%user_id, error = %e, "[MindfulnessStore] failed to fetch today's sessions");
        })?;
        self.cell.update_if_current(generation, |state| state.today_sessions = sessions);
        Ok(())
    }

    /// Refreshes the session history only. Failures are logged.
    pub async fn fetch_history(&self, user_id: &UserId) -> Result<()> {
        let generation = self.cell.generation();
        let sessions = self
            .gateway
            .session_history(user_id, self.history_limit)
            .await
            .inspect_err(|e| {
                tracing::error!(%user_id, error = %e, "[MindfulnessStore] failed to fetch session history");
            })?;
        self.cell.update_if_current(generation, |state| state.session_history = sessions);
        Ok(())
    }

    /// Fetches both lists concurrently and replaces them together.
    pub async fn fetch_all(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let (today_sessions, history) = tokio::join!(
            self.gateway.sessions_by_date(user_id, today()),
            self.gateway.session_history(user_id, self.history_limit),
        );
        let result = today_sessions.and_then(|t| history.map(|h| (t, h)));
        finish_load(&self.cell, STORE, generation, result, |state, (today_sessions, history)| {
            state.today_sessions = today_sessions;
            state.session_history = history;
        })
    }

    pub fn apply_local(&self, mutation: &MindfulnessMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    /// Persists a recorded session. A completed session also advances the
    /// mindfulness streak once the server has it.
    pub fn schedule_persist(
        self: &Arc<Self>,
        mutation: MindfulnessMutation,
        user_id: Option<&UserId>,
    ) -> Option<PersistTask> {
        let user_id = user_id?.clone();
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        match mutation {
            MindfulnessMutation::RecordSession(session) => Some(PersistTask::spawn(async move {
                let draft = SessionDraft {
                    session_id: session.session_id.clone(),
                    session_title: session.session_title.clone(),
                    category: session.category.clone(),
                    duration_seconds: session.duration_seconds,
                    target_duration_seconds: session.target_duration_seconds,
                    completed: session.completed,
                    phases_completed: session.phases_completed,
                    total_phases: session.total_phases,
                };
                let result = store.gateway.record_session(&user_id, session.date, draft).await;
                let created = result.is_ok();
                let outcome = PersistOutcome::from_create(session.id.clone(), result);
                let result = settle(&store.cell, STORE, generation, outcome, reconcile);

                if created && session.completed && result != ReconcileOutcome::Stale {
                    if let Err(e) = store.coach.update_streak(&user_id, StreakType::Mindfulness, today()).await {
                        tracing::error!(%user_id, error = %e, "[MindfulnessStore] failed to update mindfulness streak");
                    }
                }
                result
            })),
        }
    }

    pub fn record_session(self: &Arc<Self>, draft: SessionDraft, user_id: Option<&UserId>) -> Submitted {
        let mutation = MindfulnessMutation::record(draft, user_id);
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, user_id);
        Submitted { local, persist }
    }

    pub fn reset(&self) {
        self.cell.reset(MindfulnessState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breathing(completed: bool) -> SessionDraft {
        SessionDraft {
            session_id: "box-breathing".into(),
            session_title: "Box breathing".into(),
            duration_seconds: 300,
            completed,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_prepends_to_both_lists() {
        let mut state = MindfulnessState::default();
        let first = MindfulnessMutation::record(breathing(true), None);
        let second = MindfulnessMutation::record(breathing(false), None);
        apply(&mut state, &first);
        let local = apply(&mut state, &second);

        assert_eq!(state.today_sessions.len(), 2);
        assert_eq!(state.session_history[0].id, *local.id().unwrap());
        assert!(state.today_sessions[0].id.is_temporary());
    }

    #[test]
    fn test_reconcile_swaps_ids_in_both_lists() {
        let mut state = MindfulnessState::default();
        let mutation = MindfulnessMutation::record(breathing(true), None);
        let temp = apply(&mut state, &mutation).id().cloned().unwrap();

        let mut record = match mutation {
            MindfulnessMutation::RecordSession(session) => session,
        };
        record.id = EntityId::generate();
        let server_id = record.id.clone();
        let (state, result) = reconcile(
            state,
            &PersistOutcome::Created {
                temp_id: temp,
                record,
            },
        );

        assert!(matches!(result, ReconcileOutcome::Replaced { .. }));
        assert_eq!(state.today_sessions[0].id, server_id);
        assert_eq!(state.session_history[0].id, server_id);
    }
}
