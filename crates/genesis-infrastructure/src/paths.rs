//! Path resolution for GENESIS local files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/genesis/           # Config directory (platform config dir)
//! ├── config.toml              # Application configuration
//! └── logs/                    # Rolling log files
//!     └── genesis.log.YYYY-MM-DD
//! ```

use genesis_core::GenesisError;
use genesis_core::error::Result;
use std::path::PathBuf;

const APP_DIR: &str = "genesis";

pub struct GenesisPaths;

impl GenesisPaths {
    /// Returns the GENESIS configuration directory (e.g. `~/.config/genesis/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| GenesisError::config("cannot determine the platform config directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_is_under_config_dir() {
        let Ok(config_dir) = GenesisPaths::config_dir() else {
            return;
        };
        assert!(config_dir.ends_with("genesis"));

        let config_file = GenesisPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        assert!(config_file.starts_with(&config_dir));
        assert!(GenesisPaths::logs_dir().unwrap().starts_with(&config_dir));
    }
}
