//! Non-learning baselines to compare a trained agent against.

pub mod search;

pub use search::{iterative_sweep, random_search, SearchResult};
