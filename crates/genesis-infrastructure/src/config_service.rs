//! Configuration service implementation.
//!
//! Loads [`GenesisConfig`] from `~/.config/genesis/config.toml`, writing a
//! default file on first run, and layers environment overrides on top.

use crate::paths::GenesisPaths;
use genesis_core::config::{GatewayBackend, GenesisConfig};
use genesis_core::error::Result;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Base URL of the backend; selects the PostgREST gateway.
pub const ENV_API_URL: &str = "GENESIS_API_URL";
/// Public API key of the backend.
pub const ENV_API_KEY: &str = "GENESIS_API_KEY";
/// Default log filter.
pub const ENV_LOG: &str = "GENESIS_LOG";

/// Loads and caches the configuration.
#[derive(Debug)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration, environment overrides already applied.
    config: RwLock<Option<GenesisConfig>>,
}

impl ConfigService {
    /// Uses the platform config file.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(GenesisPaths::config_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, reading the file on first access.
    pub fn load(&self) -> Result<GenesisConfig> {
        if let Some(cached) = self.config.read().as_ref() {
            return Ok(cached.clone());
        }

        let mut config = self.read_or_create()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        *self.config.write() = Some(config.clone());
        Ok(config)
    }

    /// Like [`ConfigService::load`], falling back to defaults when the file
    /// cannot be read.
    pub fn get_config(&self) -> GenesisConfig {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "[ConfigService] using default configuration");
            let mut config = GenesisConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        })
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write() = None;
    }

    /// Writes `config` to the file and refreshes the cache.
    pub fn save(&self, config: &GenesisConfig) -> Result<()> {
        write_config(&self.path, config)?;
        self.invalidate_cache();
        Ok(())
    }

    fn read_or_create(&self) -> Result<GenesisConfig> {
        if !self.path.exists() {
            let config = GenesisConfig::default();
            write_config(&self.path, &config)?;
            tracing::info!(path = %self.path.display(), "[ConfigService] wrote default configuration");
            return Ok(config);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config = toml::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), "[ConfigService] configuration loaded");
        Ok(config)
    }
}

fn write_config(path: &Path, config: &GenesisConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

/// Applies `GENESIS_*` overrides read through `lookup`.
///
/// Setting the API URL also switches the backend to PostgREST.
pub fn apply_env_overrides(config: &mut GenesisConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
        config.gateway.url = Some(url);
        config.gateway.backend = GatewayBackend::Postgrest;
    }
    if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
        config.gateway.anon_key = Some(key);
    }
    if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
        config.logging.level = level;
    }
}
