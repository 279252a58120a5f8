pub mod chat;
pub mod config;
pub mod date;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod mindfulness;
pub mod nutrition;
pub mod profile;
pub mod progress;
pub mod realtime;
pub mod season;
pub mod session;

// Re-export common types
pub use error::{GenesisError, Result};
pub use gateway::Gateways;
pub use identity::{EntityId, Identified, UserId};
