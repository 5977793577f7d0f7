//! Weight persistence.
//!
//! Only plain weight serialization is supported; see [`weights`] for the format.

pub mod weights;

pub use weights::{load_weights, save_weights};
