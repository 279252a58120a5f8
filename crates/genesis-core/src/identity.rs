//! Identifier types.
//!
//! Server-assigned identifiers are UUIDs. Identifiers minted on the client for
//! optimistic placeholders never parse as a UUID, which is how the stores tell
//! the two apart without carrying an extra flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a domain entity, either server-assigned or temporary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh server-style identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Mints a temporary identifier of the form `tmp-<prefix>-<n>`.
    ///
    /// The sequence is process-wide, so two placeholders never share a key
    /// even when created within the same millisecond.
    pub fn temporary(prefix: &str) -> Self {
        let n = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("tmp-{prefix}-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier has the server (UUID) format.
    pub fn is_server(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }

    pub fn is_temporary(&self) -> bool {
        !self.is_server()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Implemented by every entity that lives in a keyed store collection.
pub trait Identified {
    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_id_detection() {
        let id = EntityId::new("550e8400-e29b-41d4-a716-446655440000");
        assert!(id.is_server());
        assert!(!id.is_temporary());
        assert!(EntityId::new("550E8400-E29B-41D4-A716-446655440000").is_server());
    }

    #[test]
    fn test_temporary_ids_are_unique_and_not_uuids() {
        let a = EntityId::temporary("lunch");
        let b = EntityId::temporary("lunch");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("tmp-lunch-"));
        assert!(a.is_temporary());
        assert!(b.is_temporary());
    }

    #[test]
    fn test_generated_ids_are_server_ids() {
        assert!(EntityId::generate().is_server());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = EntityId::new("a1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a1\"");
        let user: UserId = serde_json::from_str("\"user-1\"").unwrap();
        assert_eq!(user.as_str(), "user-1");
    }
}
