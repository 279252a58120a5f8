//! Data orchestrator.
//!
//! Wires the domain stores to the session lifecycle:
//!
//! ```text
//! Idle --sign in--> Loading --fetches settled--> Ready
//!  ^                   ^                           |
//!  |                   +------account switch-------+
//!  +-----------------------sign out----------------+
//! ```
//!
//! The orchestrator only invokes store operations and reads store status; it
//! never touches store state directly.

use crate::store::{
    ChatStore, MindfulnessStore, NutritionStore, ProfileStore, ProgressStore, SeasonStore, StoreStatus,
};
use async_trait::async_trait;
use futures::future::join_all;
use genesis_core::config::SyncConfig;
use genesis_core::error::Result;
use genesis_core::session::SessionProvider;
use genesis_core::{GenesisError, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;

/// A store the orchestrator loads and resets.
#[async_trait]
pub trait DomainStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Replaces the store's state with the server's for `user_id`.
    async fn fetch_all(&self, user_id: &UserId) -> Result<()>;

    fn reset(&self);

    fn status(&self) -> StoreStatus;
}

/// A store that keeps a push channel open while a user is signed in.
#[async_trait]
pub trait LiveStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn subscribe(&self, user_id: &UserId) -> Result<()>;

    async fn unsubscribe(&self);
}

macro_rules! impl_domain_store {
    ($store:ty, $name:literal, $fetch:ident) => {
        #[async_trait]
        impl DomainStore for $store {
            fn name(&self) -> &'static str {
                $name
            }

            async fn fetch_all(&self, user_id: &UserId) -> Result<()> {
                <$store>::$fetch(self, user_id).await
            }

            fn reset(&self) {
                <$store>::reset(self)
            }

            fn status(&self) -> StoreStatus {
                <$store>::status(self)
            }
        }
    };
}

impl_domain_store!(NutritionStore, "nutrition", fetch_all);
impl_domain_store!(MindfulnessStore, "mindfulness", fetch_all);
impl_domain_store!(ChatStore, "chat", fetch_messages);
impl_domain_store!(SeasonStore, "season", fetch_all);
impl_domain_store!(ProgressStore, "progress", fetch_all);
impl_domain_store!(ProfileStore, "profile", fetch_profile);

#[async_trait]
impl LiveStore for ChatStore {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn subscribe(&self, user_id: &UserId) -> Result<()> {
        ChatStore::subscribe(self, user_id).await
    }

    async fn unsubscribe(&self) {
        ChatStore::unsubscribe(self).await
    }
}

/// The stores one orchestrator drives.
#[derive(Clone, Default)]
pub struct StoreSet {
    pub stores: Vec<Arc<dyn DomainStore>>,
    pub live: Vec<Arc<dyn LiveStore>>,
}

impl StoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn DomainStore>) -> Self {
        self.stores.push(store);
        self
    }

    pub fn with_live(mut self, store: Arc<dyn LiveStore>) -> Self {
        self.live.push(store);
        self
    }
}

/// Where the orchestrator is in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading {
        user_id: UserId,
    },
    Ready {
        user_id: UserId,
    },
}

impl SyncPhase {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            SyncPhase::Idle => None,
            SyncPhase::Loading { user_id } | SyncPhase::Ready { user_id } => Some(user_id),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SyncPhase::Ready { .. })
    }
}

/// How one store's fetch settled.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOutcome {
    pub store: &'static str,
    pub result: Result<()>,
}

/// Per-store results of a fetch fan-out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefreshReport {
    pub outcomes: Vec<StoreOutcome>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StoreOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    /// Collapses the report into one result; several failures become [`GenesisError::Multiple`].
    pub fn into_result(self) -> Result<()> {
        let mut errors: Vec<GenesisError> = self.outcomes.into_iter().filter_map(|o| o.result.err()).collect();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(GenesisError::Multiple(errors)),
        }
    }
}

/// Drives every domain store through sign-in, account switch and sign-out.
///
/// # Transitions
///
/// Transitions are serialized. Each one takes a ticket (`epoch`) before
/// waiting for its turn; a transition whose ticket is no longer the newest
/// when it runs is skipped, and a load that finishes after a newer
/// transition was requested leaves the phase alone instead of marking
/// Ready for an identity that is gone.
///
/// # Refresh
///
/// [`DataOrchestrator::refresh`] re-runs the fetch fan-out for the current
/// identity without touching subscriptions. It does not wait for pending
/// transitions.
pub struct DataOrchestrator {
    stores: StoreSet,
    clear_on_sign_out: bool,
    phase: watch::Sender<SyncPhase>,
    /// Ticket of the newest requested transition.
    epoch: AtomicU64,
    transition: AsyncMutex<()>,
    /// The user whose data the stores currently hold.
    loaded_for: Mutex<Option<UserId>>,
}

impl DataOrchestrator {
    pub fn new(stores: StoreSet, config: &SyncConfig) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            stores,
            clear_on_sign_out: config.clear_on_sign_out,
            phase,
            epoch: AtomicU64::new(0),
            transition: AsyncMutex::new(()),
            loaded_for: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase.borrow().clone()
    }

    /// Receives every phase change.
    pub fn phase_watch(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn statuses(&self) -> Vec<(&'static str, StoreStatus)> {
        self.stores
            .stores
            .iter()
            .map(|store| (store.name(), store.status()))
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.stores.stores.iter().any(|store| store.status().is_loading)
    }

    /// Moves to the phase matching `identity`.
    ///
    /// Returns the fetch report when this call ran a load to completion.
    pub async fn on_identity(&self, identity: Option<UserId>) -> Option<RefreshReport> {
        let epoch = self.next_epoch();
        self.transition(epoch, identity).await
    }

    /// Re-fetches every store for the current identity.
    ///
    /// Resolves once every fetch has settled; one store's failure does not
    /// stop the others.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let Some(user_id) = self.phase.borrow().user_id().cloned() else {
            return Err(GenesisError::NoSession);
        };
        tracing::info!(%user_id, "[DataOrchestrator] refreshing");
        let report = self.fan_out(&user_id).await;
        if !report.is_success() {
            tracing::warn!(
                %user_id,
                failed = report.failures().count(),
                "[DataOrchestrator] refresh settled with failures"
            );
        }
        Ok(report)
    }

    /// Follows `session` until it closes.
    ///
    /// Each identity change is handed to its own task so a newer identity
    /// supersedes a load still in flight.
    pub async fn run(self: Arc<Self>, session: Arc<dyn SessionProvider>) {
        let mut identity = session.watch();
        let mut last: Option<Option<UserId>> = None;
        let mut pending: Option<JoinHandle<Option<RefreshReport>>> = None;

        loop {
            let next = identity.borrow_and_update().clone();
            if last.as_ref() != Some(&next) {
                last = Some(next.clone());
                let epoch = self.next_epoch();
                let this = Arc::clone(&self);
                pending = Some(tokio::spawn(async move { this.transition(epoch, next).await }));
            }
            if identity.changed().await.is_err() {
                tracing::info!("[DataOrchestrator] session provider closed");
                break;
            }
        }

        if let Some(task) = pending
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "[DataOrchestrator] transition task ended abnormally");
        }
    }

    /// Spawns [`DataOrchestrator::run`] on the current runtime.
    pub fn spawn(self: &Arc<Self>, session: Arc<dyn SessionProvider>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(session))
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn transition(&self, epoch: u64, identity: Option<UserId>) -> Option<RefreshReport> {
        let _turn = self.transition.lock().await;
        if !self.is_current(epoch) {
            tracing::debug!(epoch, "[DataOrchestrator] transition superseded before it started");
            return None;
        }

        match identity {
            None => {
                self.sign_out().await;
                None
            }
            Some(user_id) => self.sign_in(epoch, user_id).await,
        }
    }

    async fn sign_out(&self) {
        if self.phase.borrow().user_id().is_none() {
            return;
        }
        tracing::info!("[DataOrchestrator] identity cleared, tearing down");
        self.unsubscribe_all().await;
        if self.clear_on_sign_out {
            self.reset_all();
        }
        self.phase.send_replace(SyncPhase::Idle);
    }

    async fn sign_in(&self, epoch: u64, user_id: UserId) -> Option<RefreshReport> {
        if *self.phase.borrow() == (SyncPhase::Ready { user_id: user_id.clone() }) {
            tracing::debug!(%user_id, "[DataOrchestrator] already ready, checking channels");
            // Live channels are a no-op; dropped ones reopen.
            self.subscribe_all(&user_id).await;
            return None;
        }

        let previous = self.loaded_for.lock().clone();
        if let Some(previous) = previous.filter(|previous| previous != &user_id) {
            tracing::info!(from = %previous, to = %user_id, "[DataOrchestrator] account switch");
            self.unsubscribe_all().await;
            self.reset_all();
        }
        *self.loaded_for.lock() = Some(user_id.clone());

        tracing::info!(%user_id, "[DataOrchestrator] loading");
        self.phase.send_replace(SyncPhase::Loading {
            user_id: user_id.clone(),
        });

        let (report, ()) = tokio::join!(self.fan_out(&user_id), self.subscribe_all(&user_id));
        for failure in report.failures() {
            tracing::warn!(store = failure.store, %user_id, "[DataOrchestrator] initial fetch failed");
        }

        if self.is_current(epoch) {
            tracing::info!(%user_id, "[DataOrchestrator] ready");
            self.phase.send_replace(SyncPhase::Ready { user_id });
        } else {
            tracing::debug!(%user_id, "[DataOrchestrator] identity moved on during load");
        }
        Some(report)
    }

    async fn fan_out(&self, user_id: &UserId) -> RefreshReport {
        let outcomes = join_all(self.stores.stores.iter().map(|store| async move {
            StoreOutcome {
                store: store.name(),
                result: store.fetch_all(user_id).await,
            }
        }))
        .await;
        RefreshReport { outcomes }
    }

    async fn subscribe_all(&self, user_id: &UserId) {
        let results = join_all(self.stores.live.iter().map(|store| async move {
            (store.name(), store.subscribe(user_id).await)
        }))
        .await;
        for (store, result) in results {
            if let Err(e) = result {
                tracing::warn!(store, %user_id, error = %e, "[DataOrchestrator] subscription failed");
            }
        }
    }

    async fn unsubscribe_all(&self) {
        join_all(self.stores.live.iter().map(|store| store.unsubscribe())).await;
    }

    fn reset_all(&self) {
        for store in &self.stores.stores {
            store.reset();
        }
        *self.loaded_for.lock() = None;
    }
}
