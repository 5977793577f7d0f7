use ndarray::Array2;
use serde::{Serialize, Deserialize};

/// An enumeration of the activation functions a layer can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Sigmoid,
    Relu,
    Linear,
}

impl Activation {
    /// Evaluate the activation (or its derivative when `derivative` is set) elementwise.
    pub fn evaluate(&self, input: &Array2<f32>, derivative: bool) -> Array2<f32> {
        match (self, derivative) {
            (Activation::Sigmoid, false) => input.mapv(sigmoid),
            (Activation::Sigmoid, true) => input.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            (Activation::Relu, false) => input.mapv(|v| if v > 0.0 { v } else { 0.0 }),
            (Activation::Relu, true) => input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            (Activation::Linear, false) => input.clone(),
            (Activation::Linear, true) => Array2::ones(input.dim()),
        }
    }
}

#[inline]
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}
