mod gateway;
mod model;

pub use gateway::ProfileGateway;
pub use model::{Profile, ProfilePatch, Subscription};
