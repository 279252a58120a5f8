//! Configuration model.
//!
//! Every field has a default so a partial (or empty) `config.toml` is valid.

use crate::nutrition::MacroTargets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayBackend {
    /// In-process backend, used for demos and tests
    #[default]
    Memory,
    /// PostgREST-compatible HTTP backend
    Postgrest,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub backend: GatewayBackend,
    /// Base URL of the backend (e.g. `https://project.example.co`)
    pub url: Option<String>,
    /// Public (anon) API key sent as `apikey`
    pub anon_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Interval of the polling push channel
    pub poll_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::Memory,
            url: None,
            anon_key: None,
            request_timeout_secs: 10,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Reset every store when the user signs out
    pub clear_on_sign_out: bool,
    /// Capacity of each push channel's inbound queue
    pub event_queue_capacity: usize,
    pub recent_message_limit: usize,
    pub weight_history_limit: usize,
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            clear_on_sign_out: true,
            event_queue_capacity: 64,
            recent_message_limit: 20,
            weight_history_limit: 12,
            history_limit: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NutritionConfig {
    pub default_targets: MacroTargets,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Optional log file; rotated daily
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Root configuration loaded from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct GenesisConfig {
    pub gateway: GatewayConfig,
    pub sync: SyncConfig,
    pub nutrition: NutritionConfig,
    pub logging: LoggingConfig,
}
