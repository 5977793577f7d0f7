//! Training metrics: bounded histories of losses, rewards and exploration,
//! plus counters for skipped steps and target synchronizations.

pub mod tracker;

pub use tracker::{MetricsTracker, TrainingMetrics};
