//! Domain stores.
//!
//! Each store owns one slice of client state behind a synchronous lock, so an
//! optimistic apply is visible to the very next read. Network work runs on
//! spawned tasks whose completions are folded back through a pure
//! `reconcile` function.
//!
//! # Modules
//!
//! - `cell`: the lock, generation guard and revision channel shared by every store
//! - `reconcile`: identifier replacement and last-write-wins helpers
//! - `nutrition`, `mindfulness`, `chat`, `season`, `progress`, `profile`: the stores

mod cell;
pub mod chat;
pub mod mindfulness;
pub mod nutrition;
pub mod profile;
pub mod progress;
pub mod reconcile;
pub mod season;

pub use cell::StoreCell;
pub use chat::{ChatMutation, ChatState, ChatStore};
pub use mindfulness::{MindfulnessMutation, MindfulnessState, MindfulnessStore};
pub use nutrition::{NutritionMutation, NutritionState, NutritionStore};
pub use profile::{ProfileMutation, ProfileState, ProfileStore};
pub use progress::{ProgressMutation, ProgressState, ProgressStore};
pub use season::{SeasonMutation, SeasonState, SeasonStore};

use genesis_core::error::Result;
use genesis_core::{EntityId, GenesisError};
use tokio::task::JoinHandle;

/// Loading and error fields every store state carries.
pub(crate) trait HasStatus {
    fn is_loading(&self) -> bool;
    fn error(&self) -> Option<&str>;
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<String>);
}

macro_rules! impl_has_status {
    ($state:ty) => {
        impl $crate::store::HasStatus for $state {
            fn is_loading(&self) -> bool {
                self.is_loading
            }

            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }

            fn set_loading(&mut self, loading: bool) {
                self.is_loading = loading;
            }

            fn set_error(&mut self, error: Option<String>) {
                self.error = error;
            }
        }
    };
}
pub(crate) use impl_has_status;

/// Loading and error flags of one store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreStatus {
    pub(crate) fn of<S: HasStatus>(state: &S) -> Self {
        Self {
            is_loading: state.is_loading(),
            error: state.error().map(str::to_string),
        }
    }
}

/// Result of the synchronous phase of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalResult {
    /// State changed. Carries the key of the entity created or touched, if any.
    Applied(Option<EntityId>),
    /// Nothing to change locally (e.g. clearing an empty partition).
    Unchanged,
}

impl LocalResult {
    pub fn id(&self) -> Option<&EntityId> {
        match self {
            LocalResult::Applied(id) => id.as_ref(),
            LocalResult::Unchanged => None,
        }
    }
}

/// What the network call of a mutation returned.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome<R> {
    /// A create under `temp_id` was confirmed as `record`.
    Created { temp_id: EntityId, record: R },
    /// The server returned its version of an updated record.
    Saved(R),
    /// Accepted with nothing to merge back (deletes, bulk deletes, acks).
    Done,
    /// The write failed. `temp_id` is set for failed creates.
    Failed {
        temp_id: Option<EntityId>,
        error: GenesisError,
    },
}

impl<R> PersistOutcome<R> {
    pub fn failed(error: GenesisError) -> Self {
        PersistOutcome::Failed { temp_id: None, error }
    }

    /// Maps a create result.
    pub fn from_create(temp_id: EntityId, result: Result<R>) -> Self {
        match result {
            Ok(record) => PersistOutcome::Created { temp_id, record },
            Err(error) => PersistOutcome::Failed {
                temp_id: Some(temp_id),
                error,
            },
        }
    }

    /// Maps an update result carrying the server's record.
    pub fn from_save(result: Result<R>) -> Self {
        match result {
            Ok(record) => PersistOutcome::Saved(record),
            Err(error) => PersistOutcome::failed(error),
        }
    }

    /// Maps a result whose value is not merged back.
    pub fn from_ack<T>(result: Result<T>) -> Self {
        match result {
            Ok(_) => PersistOutcome::Done,
            Err(error) => PersistOutcome::failed(error),
        }
    }
}

/// How a persist completion was folded into store state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The temporary key was swapped for the server key in place.
    Replaced { temp_id: EntityId, server_id: EntityId },
    /// The server accepted the write; local state already matches.
    Acknowledged,
    /// The write failed; local state was left as applied.
    Failed { error: GenesisError },
    /// The store was reset since the write was issued; nothing was applied.
    Stale,
    /// The entity was removed locally before its create resolved.
    Orphaned { temp_id: EntityId, server_id: EntityId },
}

impl ReconcileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReconcileOutcome::Failed { .. })
    }
}

/// Handle on a background persist.
///
/// Dropping it does not cancel the write.
#[derive(Debug)]
pub struct PersistTask {
    handle: JoinHandle<ReconcileOutcome>,
}

impl PersistTask {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ReconcileOutcome> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Waits for the write and its reconciliation.
    pub async fn outcome(self) -> ReconcileOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => ReconcileOutcome::Failed {
                error: GenesisError::internal(format!("persist task did not complete: {e}")),
            },
        }
    }
}

/// Both phases of a mutation issued through a store's convenience method.
#[derive(Debug)]
pub struct Submitted {
    pub local: LocalResult,
    pub persist: Option<PersistTask>,
}

impl Submitted {
    pub fn id(&self) -> Option<&EntityId> {
        self.local.id()
    }

    /// Waits for the background write, if one was issued.
    pub async fn settled(self) -> Option<ReconcileOutcome> {
        match self.persist {
            Some(task) => Some(task.outcome().await),
            None => None,
        }
    }
}

/// Marks a store as loading and returns the generation the fetch belongs to.
pub(crate) fn begin_load<S: HasStatus + Clone>(cell: &StoreCell<S>) -> u64 {
    let (generation, ()) = cell.update_tracked(|state| {
        state.set_loading(true);
        state.set_error(None);
    });
    generation
}

/// Folds a fetch result into the store.
///
/// On failure the prior state is kept and the message recorded in the
/// store's `error` field. A result from before a reset is dropped.
pub(crate) fn finish_load<S, T>(
    cell: &StoreCell<S>,
    store: &'static str,
    generation: u64,
    result: Result<T>,
    apply: impl FnOnce(&mut S, T),
) -> Result<()>
where
    S: HasStatus + Clone,
{
    let settled = cell.update_if_current(generation, |state| {
        state.set_loading(false);
        match result {
            Ok(value) => {
                apply(state, value);
                Ok(())
            }
            Err(e) => {
                state.set_error(Some(e.to_string()));
                Err(e)
            }
        }
    });

    match settled {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => {
            tracing::warn!(store, error = %e, "[{store}] fetch failed, keeping last known state");
            Err(e)
        }
        None => {
            tracing::debug!(store, generation, "[{store}] discarding fetch issued before reset");
            Ok(())
        }
    }
}

/// Folds a persist completion into the store through its reconcile function.
pub(crate) fn settle<S, R>(
    cell: &StoreCell<S>,
    store: &'static str,
    generation: u64,
    outcome: PersistOutcome<R>,
    reconcile: fn(S, &PersistOutcome<R>) -> (S, ReconcileOutcome),
) -> ReconcileOutcome
where
    S: Clone + Default,
{
    let result = cell
        .update_if_current(generation, |state| {
            let (next, result) = reconcile(std::mem::take(state), &outcome);
            *state = next;
            result
        })
        .unwrap_or(ReconcileOutcome::Stale);

    match &result {
        ReconcileOutcome::Replaced { temp_id, server_id } => {
            tracing::debug!(store, %temp_id, %server_id, "[{store}] replaced temporary id");
        }
        ReconcileOutcome::Acknowledged => {}
        ReconcileOutcome::Failed { error } => {
            tracing::error!(store, error = %error, "[{store}] persist failed, keeping optimistic state");
        }
        ReconcileOutcome::Stale => {
            tracing::debug!(store, generation, "[{store}] ignoring persist completion from before reset");
        }
        ReconcileOutcome::Orphaned { temp_id, server_id } => {
            tracing::debug!(store, %temp_id, %server_id, "[{store}] create resolved after local removal");
        }
    }
    result
}

/// Reconcile step shared by the failure arms: records the message, never reverts.
pub(crate) fn record_failure<S: HasStatus>(state: &mut S, error: &GenesisError) -> ReconcileOutcome {
    state.set_error(Some(error.to_string()));
    ReconcileOutcome::Failed { error: error.clone() }
}
