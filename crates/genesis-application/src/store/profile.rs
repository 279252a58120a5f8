//! Profile store: the user's profile and plan subscription.

use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use genesis_core::UserId;
use genesis_core::error::Result;
use genesis_core::profile::{Profile, ProfileGateway, ProfilePatch, Subscription};
use std::sync::Arc;
use tokio::sync::watch;

const STORE: &str = "ProfileStore";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileState {
    pub profile: Option<Profile>,
    pub subscription: Option<Subscription>,
    pub is_loading: bool,
    pub error: Option<String>,
}

super::impl_has_status!(ProfileState);

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileMutation {
    Update(ProfilePatch),
}

pub fn apply(state: &mut ProfileState, mutation: &ProfileMutation) -> LocalResult {
    match mutation {
        ProfileMutation::Update(patch) => match state.profile.as_mut() {
            Some(profile) => {
                patch.apply(profile);
                LocalResult::Applied(None)
            }
            None => LocalResult::Unchanged,
        },
    }
}

pub fn reconcile(mut state: ProfileState, outcome: &PersistOutcome<Profile>) -> (ProfileState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Saved(profile) | PersistOutcome::Created { record: profile, .. } => {
            state.profile = Some(profile.clone());
            ReconcileOutcome::Acknowledged
        }
        PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { error, .. } => record_failure(&mut state, error),
    };
    (state, result)
}

pub struct ProfileStore {
    cell: StoreCell<ProfileState>,
    gateway: Arc<dyn ProfileGateway>,
}

impl ProfileStore {
    pub fn new(gateway: Arc<dyn ProfileGateway>) -> Self {
        Self {
            cell: StoreCell::new(ProfileState::default()),
            gateway,
        }
    }

    pub fn snapshot(&self) -> ProfileState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ProfileState) -> R) -> R {
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

    /// Fetches the profile and the active subscription together.
    pub async fn fetch_profile(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let (profile, subscription) = tokio::join!(
            self.gateway.profile(user_id),
            self.gateway.active_subscription(user_id),
        );
        let result = profile.and_then(|p| subscription.map(|s| (p, s)));
        finish_load(&self.cell, STORE, generation, result, |state, (profile, subscription)| {
            state.profile = profile;
            state.subscription = subscription;
        })
    }

    pub fn apply_local(&self, mutation: &ProfileMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    pub fn schedule_persist(self: &Arc<Self>, mutation: ProfileMutation, user_id: Option<&UserId>) -> Option<PersistTask> {
        let user_id = user_id?.clone();
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        match mutation {
            ProfileMutation::Update(patch) => Some(PersistTask::spawn(async move {
                let result = store.gateway.update_profile(&user_id, patch).await;
                settle(&store.cell, STORE, generation, PersistOutcome::from_save(result), reconcile)
            })),
        }
    }

    pub fn update_profile(self: &Arc<Self>, user_id: &UserId, patch: ProfilePatch) -> Submitted {
        let mutation = ProfileMutation::Update(patch);
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, Some(user_id));
        Submitted { local, persist }
    }

    /// Marks onboarding done along with the answers collected during it.
    pub fn complete_onboarding(self: &Arc<Self>, user_id: &UserId, mut answers: ProfilePatch) -> Submitted {
        answers.onboarding_completed = Some(true);
        self.update_profile(user_id, answers)
    }

    pub fn reset(&self) {
        self.cell.reset(ProfileState::default());
    }
}
