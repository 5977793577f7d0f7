//! # Environment Module
//!
//! The agent only ever talks to its environment through [`Environment`]:
//! read a fixed-length state vector, apply an action, measure the episode
//! reward at the end, and reset for a new episode.
//!
//! - [`CompilerEnvironment`] adapts any [`ProgramRunner`] (something that can
//!   build a program with a set of flags, extract its features and time it)
//!   into an environment whose actions are compiler flags.
//! - [`TimeoutEnvironment`] moves an environment onto a worker thread and
//!   bounds every call with a deadline.

pub mod compiler;
pub mod timeout;

pub use compiler::{CompilerEnvironment, ProgramRunner};
pub use timeout::TimeoutEnvironment;

use ndarray::Array1;

use crate::error::Result;

/// The external system the agent acts on.
pub trait Environment {
    /// Current state; always the same length, equal to the network's input width.
    fn state(&mut self) -> Result<Array1<f32>>;

    /// Apply an action to the accumulated configuration. Repeating an action is safe.
    fn apply(&mut self, action: usize) -> Result<()>;

    /// Measure the episode's reward. Only called at the end of an episode.
    fn measure_terminal_reward(&mut self) -> Result<f32>;

    /// Start a new episode, optionally against a different program.
    fn reset(&mut self, program: Option<&str>) -> Result<()>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn state(&mut self) -> Result<Array1<f32>> {
        (**self).state()
    }

    fn apply(&mut self, action: usize) -> Result<()> {
        (**self).apply(action)
    }

    fn measure_terminal_reward(&mut self) -> Result<f32> {
        (**self).measure_terminal_reward()
    }

    fn reset(&mut self, program: Option<&str>) -> Result<()> {
        (**self).reset(program)
    }
}
