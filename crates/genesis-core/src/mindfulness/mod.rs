//! Mindfulness domain module.

mod gateway;
mod model;

pub use gateway::MindfulnessGateway;
pub use model::{MindfulnessSession, SessionDraft};
