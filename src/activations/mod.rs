//! # Activation Functions Module
//!
//! Elementwise activation functions for the feed-forward network. Each variant
//! evaluates either the function itself or its derivative, selected by a single
//! `derivative` flag, so layers call one method for both forms.
//!
//! ## Available Activations
//!
//! - **Sigmoid**: `1 / (1 + e^(-x))`, derivative `s(1 - s)`
//! - **ReLU**: `max(0, x)`, derivative `1` above zero and `0` otherwise
//! - **Linear**: identity, derivative constantly `1`
//!
//! ## Usage Example
//!
//! ```rust
//! use flagforge::activations::Activation;
//! use ndarray::array;
//!
//! let pre_activation = array![[1.0, -0.5, 0.0, 2.0]];
//! let output = Activation::Relu.evaluate(&pre_activation, false);
//! let slope = Activation::Relu.evaluate(&pre_activation, true);
//! assert_eq!(output, array![[1.0, 0.0, 0.0, 2.0]]);
//! assert_eq!(slope, array![[1.0, 0.0, 0.0, 1.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
