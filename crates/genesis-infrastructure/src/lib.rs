//! Infrastructure layer for GENESIS.
//!
//! Configuration and log bootstrap, the session provider, and the gateway
//! backends: an in-process one and a PostgREST HTTP one with polling push.

pub mod config_service;
pub mod logging;
pub mod memory;
pub mod paths;
pub mod polling;
pub mod postgrest;
pub mod session;

pub use config_service::ConfigService;
pub use memory::{GatewayOp, InMemoryGateway};
pub use paths::GenesisPaths;
pub use polling::PollingPushGateway;
pub use postgrest::PostgrestGateway;
pub use session::WatchSessionProvider;

use genesis_core::Gateways;
use genesis_core::config::{GatewayBackend, GatewayConfig};
use genesis_core::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builds the gateway bundle selected by `config.backend`.
pub fn connect(config: &GatewayConfig) -> Result<Gateways> {
    match config.backend {
        GatewayBackend::Memory => {
            tracing::info!("[Gateways] using in-memory backend");
            Ok(Gateways::from_backend(InMemoryGateway::shared()))
        }
        GatewayBackend::Postgrest => {
            let backend = Arc::new(PostgrestGateway::new(config)?);
            let push = PollingPushGateway::new(backend.clone(), Duration::from_secs(config.poll_interval_secs.max(1)));
            Ok(Gateways {
                nutrition: backend.clone(),
                mindfulness: backend.clone(),
                chat: backend.clone(),
                season: backend.clone(),
                checkins: backend.clone(),
                coach: backend.clone(),
                profile: backend,
                push: Arc::new(push),
            })
        }
    }
}
