//! Chat domain module.

mod gateway;
mod model;

pub use gateway::ChatGateway;
pub use model::{Message, MessageRole, MessageType};
