//! # Agent Module
//!
//! The DQN agent and the pieces it is configured with.
//!
//! - [`DqnAgent`]: online and target networks, a replay buffer, an explicit
//!   RNG and the [`crate::environment::Environment`] it acts on.
//! - [`AgentConfig`]: hyperparameters, loadable from JSON.
//! - [`EpsilonSchedule`]: exploration rate per episode.
//!
//! The RNG is seeded from [`AgentConfig::seed`] and drives weight
//! initialization, exploration, program selection and replay sampling, so two
//! agents built from the same config against deterministic environments make
//! the same decisions.

mod config;
mod dqn;
pub mod policy;

pub use config::AgentConfig;
pub use dqn::{DqnAgent, EpisodeSummary, StepOutcome, TrainingReport};
pub use policy::EpsilonSchedule;
