use ndarray::{concatenate, s, Array2, Axis};
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{FlagforgeError, Result};

/// Position of a layer in the network, which decides which matrices it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerRole {
    Input,
    Hidden,
    Output,
}

/// A fully connected layer.
///
/// Activations are row vectors (`1 x n`). The outgoing weights `W` are `n x m`
/// where `m` is the width of the next layer, and the bias is a separate `1 x m`
/// row. Every multiplication goes through the bias-augmented forms
/// `[Z | 1]` and `[W ; b]`, so forward and update agree on the convention.
///
/// | field | role | present on |
/// |-------|------|------------|
/// | `weights` (`W`) | outgoing weights | input, hidden |
/// | `bias` | bias row appended to `W` | input, hidden |
/// | `activations` (`Z`) | post-activation output | all |
/// | `pre_activations` (`S`) | weighted input | hidden, output |
/// | `gradient` (`G`) | gradient w.r.t. `S` | hidden, output |
/// | `activation_derivative` (`Fp`) | `f'(S)` | hidden |
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Layer {
    role: LayerRole,
    pub activation: Activation,
    pub weights: Option<Array2<f32>>,
    pub bias: Option<Array2<f32>>,
    pub activations: Array2<f32>,
    pub pre_activations: Option<Array2<f32>>,
    pub gradient: Option<Array2<f32>>,
    pub activation_derivative: Option<Array2<f32>>,
}

impl Layer {
    /// Create a zeroed layer of `num_neurons` feeding `num_next_neurons`.
    /// `num_next_neurons` is ignored for the output layer.
    pub fn new(num_neurons: usize, num_next_neurons: usize, role: LayerRole, activation: Activation) -> Self {
        let has_outgoing = role != LayerRole::Output;
        let has_incoming = role != LayerRole::Input;

        Layer {
            role,
            activation,
            weights: has_outgoing.then(|| Array2::zeros((num_neurons, num_next_neurons))),
            bias: has_outgoing.then(|| Array2::zeros((1, num_next_neurons))),
            activations: Array2::zeros((1, num_neurons)),
            pre_activations: has_incoming.then(|| Array2::zeros((1, num_neurons))),
            gradient: has_incoming.then(|| Array2::zeros((1, num_neurons))),
            activation_derivative: (role == LayerRole::Hidden).then(|| Array2::zeros((1, num_neurons))),
        }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn is_input(&self) -> bool {
        self.role == LayerRole::Input
    }

    pub fn is_output(&self) -> bool {
        self.role == LayerRole::Output
    }

    /// Number of neurons in this layer.
    pub fn size(&self) -> usize {
        self.activations.ncols()
    }

    /// Compute this layer's part of the forward pass.
    ///
    /// The input layer skips the activation function and contributes the weighted
    /// sum of its raw values. Hidden layers refresh `Z` and `Fp` together and
    /// return the weighted sum for the next layer's `S`. The output layer only
    /// refreshes `Z` and returns it.
    pub fn compute_forward_contribution(&mut self) -> Result<Array2<f32>> {
        if !self.is_input() {
            let pre_activations = self.pre_activations.as_ref().ok_or_else(|| missing("S", self.role))?;
            let activations = self.activation.evaluate(pre_activations, false);
            if self.role == LayerRole::Hidden {
                self.activation_derivative = Some(self.activation.evaluate(pre_activations, true));
            }
            self.activations = activations;
        }

        if self.is_output() {
            return Ok(self.activations.clone());
        }

        let augmented = self.augmented_weights()?;
        Ok(with_bias_column(&self.activations).dot(&augmented))
    }

    /// `[W ; b]`: the weight matrix with the bias row appended, `(n + 1) x m`.
    pub fn augmented_weights(&self) -> Result<Array2<f32>> {
        let weights = self.weights.as_ref().ok_or_else(|| missing("W", self.role))?;
        let bias = self.bias.as_ref().ok_or_else(|| missing("bias", self.role))?;
        concatenate(Axis(0), &[weights.view(), bias.view()])
            .map_err(|e| FlagforgeError::NumericalError(e.to_string()))
    }

    /// Replace `W` and the bias row from an `(n + 1) x m` augmented matrix.
    pub fn set_augmented_weights(&mut self, augmented: &Array2<f32>) -> Result<()> {
        let expected = self.augmented_shape().ok_or_else(|| missing("W", self.role))?;
        if augmented.dim() != expected {
            return Err(FlagforgeError::dimension_mismatch(
                format!("{}x{}", expected.0, expected.1),
                format!("{}x{}", augmented.nrows(), augmented.ncols()),
            ));
        }

        let n = expected.0 - 1;
        self.weights = Some(augmented.slice(s![..n, ..]).to_owned());
        self.bias = Some(augmented.slice(s![n.., ..]).to_owned());
        Ok(())
    }

    /// Shape of `[W ; b]`, or `None` for the output layer.
    pub fn augmented_shape(&self) -> Option<(usize, usize)> {
        self.weights.as_ref().map(|w| (w.nrows() + 1, w.ncols()))
    }

    /// Apply `[W ; b] -= learning_rate * delta` for a precomputed augmented delta.
    pub(crate) fn apply_augmented_delta(&mut self, delta: &Array2<f32>, learning_rate: f32) -> Result<()> {
        let role = self.role;
        let weights = self.weights.as_mut().ok_or_else(|| missing("W", role))?;
        let bias = self.bias.as_mut().ok_or_else(|| missing("bias", role))?;
        let n = weights.nrows();

        if delta.dim() != (n + 1, weights.ncols()) {
            return Err(FlagforgeError::dimension_mismatch(
                format!("{}x{}", n + 1, weights.ncols()),
                format!("{}x{}", delta.nrows(), delta.ncols()),
            ));
        }

        weights.scaled_add(-learning_rate, &delta.slice(s![..n, ..]));
        bias.scaled_add(-learning_rate, &delta.slice(s![n.., ..]));
        Ok(())
    }
}

/// `[Z | 1]`: a row of activations with the constant bias input appended.
pub fn with_bias_column(activations: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = activations.dim();
    let mut augmented = Array2::ones((rows, cols + 1));
    augmented.slice_mut(s![.., ..cols]).assign(activations);
    augmented
}

fn missing(name: &str, role: LayerRole) -> FlagforgeError {
    FlagforgeError::NumericalError(format!("{:?} layer has no {} matrix", role, name))
}
