//! Error types for the GENESIS sync core.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the whole sync core.
///
/// Gateways, stores and the orchestrator all report through this type so a
/// store can keep the display string in its `error` field and the
/// orchestrator can collect per-store outcomes without downcasting.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum GenesisError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Network or HTTP-level failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend refused the request (validation, constraint, unknown code)
    #[error("Rejected by backend ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Row-level security violation or missing credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Push channel could not be opened or was dropped
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// An operation needed an authenticated user and there is none
    #[error("No active session")]
    NoSession,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Multiple errors
    #[error("Multiple errors occurred ({} total)", .0.len())]
    Multiple(Vec<GenesisError>),
}

impl GenesisError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Rejected error
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Subscription error
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an Unauthorized error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Check if retrying the same request later could succeed.
    ///
    /// Only transport failures and dropped channels qualify; a rejection or
    /// an authorization failure will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Subscription(_) => true,
            Self::Multiple(errors) => errors.iter().all(Self::is_transient),
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GenesisError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GenesisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GenesisError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GenesisError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (for glue code in binaries)
impl From<anyhow::Error> for GenesisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Conversion from String (for error messages)
impl From<String> for GenesisError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, GenesisError>`.
pub type Result<T> = std::result::Result<T, GenesisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_entity_and_id() {
        let err = GenesisError::not_found("FoodLog", "a1");
        assert_eq!(err.to_string(), "Entity not found: FoodLog 'a1'");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transient_classification() {
        assert!(GenesisError::transport("connection reset").is_transient());
        assert!(!GenesisError::rejected("23505", "duplicate key").is_transient());
        assert!(!GenesisError::Unauthorized("RLS".into()).is_transient());

        let mixed = GenesisError::Multiple(vec![
            GenesisError::transport("timeout"),
            GenesisError::NoSession,
        ]);
        assert!(!mixed.is_transient());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let err: GenesisError = io.into();
        match err {
            GenesisError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
