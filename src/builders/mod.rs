//! Fluent builders that validate their inputs before constructing anything.

pub mod agent;
pub mod network;
pub mod replay_buffer;

pub use agent::AgentBuilder;
pub use network::NetworkBuilder;
pub use replay_buffer::ReplayBufferBuilder;
