//! Client-side data sync core for GENESIS.
//!
//! This crate holds the domain stores, their reconciliation functions, the
//! push subscription manager, the data orchestrator and the selector layer.
//! Gateways are consumed through the traits in `genesis-core`.

pub mod context;
pub mod orchestrator;
pub mod selectors;
pub mod store;
pub mod subscription;

pub use context::SyncContext;
pub use orchestrator::{DataOrchestrator, DomainStore, LiveStore, RefreshReport, StoreOutcome, StoreSet, SyncPhase};
pub use store::{LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreStatus, Submitted};
pub use subscription::{PushSink, SubscriptionManager};
