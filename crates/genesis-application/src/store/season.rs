//! Season store: the active training season, today's workout and the
//! current week's plan.

use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use genesis_core::date::today;
use genesis_core::error::Result;
use genesis_core::season::{Season, SeasonGateway, SeasonPhase, SeasonProgress, Workout, WorkoutWithExercises};
use genesis_core::{EntityId, UserId};
use std::sync::Arc;
use tokio::sync::watch;

const STORE: &str = "SeasonStore";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeasonState {
    pub active_season: Option<Season>,
    pub today_workout: Option<WorkoutWithExercises>,
    pub week_workouts: Vec<Workout>,
    pub is_loading: bool,
    pub error: Option<String>,
}

super::impl_has_status!(SeasonState);

#[derive(Debug, Clone, PartialEq)]
pub enum SeasonMutation {
    UpdateProgress { season_id: EntityId, progress: SeasonProgress },
}

pub fn apply(state: &mut SeasonState, mutation: &SeasonMutation) -> LocalResult {
    match mutation {
        SeasonMutation::UpdateProgress { season_id, progress } => match state.active_season.as_mut() {
            Some(season) if &season.id == season_id => {
                progress.apply(season);
                LocalResult::Applied(Some(season.id.clone()))
            }
            _ => LocalResult::Unchanged,
        },
    }
}

/// Takes the server's season record if it is still the active one.
pub fn reconcile(mut state: SeasonState, outcome: &PersistOutcome<Season>) -> (SeasonState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Saved(season) | PersistOutcome::Created { record: season, .. } => {
            if let Some(active) = state.active_season.as_mut().filter(|active| active.id == season.id) {
                *active = season.clone();
            }
            ReconcileOutcome::Acknowledged
        }
        PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { error, .. } => record_failure(&mut state, error),
    };
    (state, result)
}

pub struct SeasonStore {
    cell: StoreCell<SeasonState>,
    gateway: Arc<dyn SeasonGateway>,
}

impl SeasonStore {
    pub fn new(gateway: Arc<dyn SeasonGateway>) -> Self {
        Self {
            cell: StoreCell::new(SeasonState::default()),
            gateway,
        }
    }

    pub fn snapshot(&self) -> SeasonState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&SeasonState) -> R) -> R {
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

    pub async fn fetch_active_season(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let result = self.gateway.active_season(user_id).await;
        finish_load(&self.cell, STORE, generation, result, |state, season| {
            state.active_season = season;
        })
    }

    /// Refreshes today's workout only. Failures are logged.
    pub async fn fetch_today_workout(&self, user_id: &UserId) -> Result<()> {
        let generation = self.cell.generation();
        let workout = self.gateway.workout_on(user_id, today()).await.inspect_err(|e| {
            tracing::error!(%user_id, error = %e, "[SeasonStore] failed to fetch today's workout");
        })?;
        self.cell.update_if_current(generation, |state| state.today_workout = workout);
        Ok(())
    }

    /// Refreshes the current week's workouts of the active season. Failures are logged.
    pub async fn fetch_week_workouts(&self, user_id: &UserId) -> Result<()> {
        let generation = self.cell.generation();
        let workouts = self.load_week(user_id).await.inspect_err(|e| {
            tracing::error!(%user_id, error = %e, "[SeasonStore] failed to fetch week workouts");
        })?;
        self.cell.update_if_current(generation, |state| state.week_workouts = workouts);
        Ok(())
    }

    /// Fetches season, today's workout and the week plan, replacing all three together.
    pub async fn fetch_all(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let (season, workout, week) = tokio::join!(
            self.gateway.active_season(user_id),
            self.gateway.workout_on(user_id, today()),
            self.load_week(user_id),
        );
        let result = season.and_then(|s| workout.and_then(|w| week.map(|k| (s, w, k))));
        finish_load(&self.cell, STORE, generation, result, |state, (season, workout, week)| {
            state.active_season = season;
            state.today_workout = workout;
            state.week_workouts = week;
        })
    }

    pub fn apply_local(&self, mutation: &SeasonMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    pub fn schedule_persist(self: &Arc<Self>, mutation: SeasonMutation, user_id: Option<&UserId>) -> Option<PersistTask> {
        user_id?;
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        match mutation {
            SeasonMutation::UpdateProgress { season_id, progress } => Some(PersistTask::spawn(async move {
                let result = store.gateway.update_season_progress(&season_id, progress).await;
                settle(&store.cell, STORE, generation, PersistOutcome::from_save(result), reconcile)
            })),
        }
    }

    /// Moves the active season to `week` and `phase`. Does nothing without an active season.
    pub fn update_season_progress(
        self: &Arc<Self>,
        week: u32,
        phase: SeasonPhase,
        user_id: Option<&UserId>,
    ) -> Submitted {
        let Some(season_id) = self.cell.read(|state| state.active_season.as_ref().map(|s| s.id.clone())) else {
            return Submitted {
                local: LocalResult::Unchanged,
                persist: None,
            };
        };
        let mutation = SeasonMutation::UpdateProgress {
            season_id,
            progress: SeasonProgress {
                current_week: week,
                current_phase: phase,
            },
        };
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, user_id);
        Submitted { local, persist }
    }

    pub fn reset(&self) {
        self.cell.reset(SeasonState::default());
    }

    /// Workouts of the active season's current week (week 1 if unset).
    async fn load_week(&self, user_id: &UserId) -> Result<Vec<Workout>> {
        let Some(season) = self.gateway.active_season(user_id).await? else {
            return Ok(Vec::new());
        };
        let week = season.current_week.unwrap_or(1);
        self.gateway.week_workouts(user_id, &season.id, week).await
    }
}
