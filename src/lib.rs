//! # flagforge - Compiler Flag Selection with Deep Q-Learning
//!
//! flagforge learns which compiler optimization flags make a program run
//! faster. An agent applies one flag per step, and at the end of each episode
//! the program is timed against its baseline; the relative speed-up is the
//! reward.
//!
//! ## Key Features
//!
//! - **Neural Network**: a small feed-forward network written from scratch with
//!   explicit forward pass, backpropagation and weight updates
//! - **Pluggable Strategies**: activations, losses and weight initializers are
//!   plain enums stored in the network and its config
//! - **DQN Agent**: replay buffer, epsilon-greedy exploration over legal
//!   actions, a periodically synchronized target network and single-action
//!   gradient masking
//! - **Environments**: a trait for anything the agent can act on, an adapter
//!   for compiler toolchains and a wrapper that bounds slow calls with a timeout
//! - **Baselines**: random search and prefix sweeps for comparison
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flagforge::agent::EpsilonSchedule;
//! use flagforge::builders::AgentBuilder;
//! use flagforge::environment::{CompilerEnvironment, ProgramRunner};
//! # use flagforge::error::Result;
//! # struct Gcc;
//! # impl ProgramRunner for Gcc {
//! #     fn features(&mut self, _: &str, _: &[String]) -> Result<Vec<f32>> { Ok(vec![0.0; 7]) }
//! #     fn runtime(&mut self, _: &str, _: &[String]) -> Result<f64> { Ok(1.0) }
//! # }
//! # fn main() -> Result<()> {
//! let flags: Vec<String> = ["-funroll-loops", "-ftree-vectorize", "-finline-functions"]
//!     .iter()
//!     .map(|flag| flag.to_string())
//!     .collect();
//! let env = CompilerEnvironment::new(Gcc, flags, vec!["-O1".into()], "matmul", 7)?;
//!
//! let mut agent = AgentBuilder::new()
//!     .layer_sizes(&[7, 30, 30, 30, 3])
//!     .episode_length(3)
//!     .epsilon(EpsilonSchedule::Constant { epsilon: 0.3 })
//!     .environment(env)
//!     .programs(vec!["matmul".into()])
//!     .build()?;
//!
//! let report = agent.train()?;
//! println!("best flags: {:?}", report.best_actions);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions and their derivatives
//! - [`agent`] - The DQN agent, its configuration and exploration schedule
//! - [`algorithms`] - Non-learning search baselines
//! - [`builders`] - Builder patterns for networks, buffers and agents
//! - [`environment`] - The environment trait, compiler adapter and timeout wrapper
//! - [`error`] - Error types and result handling
//! - [`export`] - Plain-text weight files
//! - [`layers`] - Dense layers and weight initialization
//! - [`loss`] - Loss gradients
//! - [`metrics`] - Training metrics and tracking
//! - [`network`] - Core neural network implementation
//! - [`replay_buffer`] - Experience replay
//! - [`reward`] - Reward from measured runtimes

pub mod activations;
pub mod agent;
pub mod algorithms;
pub mod builders;
pub mod environment;
pub mod error;
pub mod export;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod replay_buffer;
pub mod reward;

#[cfg(test)]
mod tests;
