//! # Loss Functions Module
//!
//! Losses here are used only for the error signal fed into backpropagation: each
//! returns a matrix shaped like the network output, consumed directly as the
//! output layer's gradient. None of them reduce to a scalar. [`Loss::value`] is
//! provided separately for monitoring.
//!
//! Every loss maps an output equal to its target to exactly zero, which is what
//! lets a masked target confine the update to a single action.

pub mod functions;

pub use functions::Loss;
