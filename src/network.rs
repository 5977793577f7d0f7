use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::activations::Activation;
use crate::error::{FlagforgeError, Result};
use crate::export::weights;
use crate::layers::dense::with_bias_column;
use crate::layers::{Layer, LayerRole, WeightInit};
use crate::loss::Loss;

/// A feed-forward network: an ordered stack of layers with one input layer,
/// any number of hidden layers and one output layer.
///
/// Training a single sample is three explicit steps so callers can substitute
/// their own targets between them:
///
/// ```rust
/// use flagforge::network::Network;
/// use flagforge::activations::Activation;
/// use flagforge::layers::WeightInit;
/// use flagforge::loss::Loss;
/// use ndarray::array;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let mut network = Network::new(
///     &[2, 8, 1],
///     (Activation::Sigmoid, Activation::Linear),
///     WeightInit::XavierUniform,
///     Loss::Difference,
///     0.1,
///     &mut rng,
/// ).unwrap();
///
/// let output = network.forward_propagate(array![0.5, -0.5].view()).unwrap();
/// assert_eq!(output.dim(), (1, 1));
/// network.back_propagate(&array![[0.2]]).unwrap();
/// network.update_weights(0.1).unwrap();
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Network {
    pub layers: Vec<Layer>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub weight_init: WeightInit,
    pub loss: Loss,
    pub learning_rate: f32,
}

impl Network {
    /// Build a network from layer widths (input first, output last).
    ///
    /// The initializer is called once per non-output layer with that layer's
    /// width as fan-in and the next layer's width as fan-out. Bias rows start at zero.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: (Activation, Activation),
        weight_init: WeightInit,
        loss: Loss,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(FlagforgeError::invalid_parameter(
                "layer_sizes",
                "Must have at least an input and an output layer",
            ));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(FlagforgeError::invalid_parameter(
                "layer_sizes",
                "Every layer needs at least one neuron",
            ));
        }
        loss.validate()?;

        let (hidden_activation, output_activation) = activations;
        let last = layer_sizes.len() - 1;

        let mut layers = Vec::with_capacity(layer_sizes.len());
        for (i, &size) in layer_sizes.iter().enumerate() {
            let layer = if i == 0 {
                // The input layer never applies its activation.
                Layer::new(size, layer_sizes[1], LayerRole::Input, Activation::Linear)
            } else if i == last {
                Layer::new(size, 0, LayerRole::Output, output_activation)
            } else {
                Layer::new(size, layer_sizes[i + 1], LayerRole::Hidden, hidden_activation)
            };
            layers.push(layer);
        }

        for layer in layers.iter_mut().take(last) {
            if let Some(w) = layer.weights.as_mut() {
                let (fan_in, fan_out) = w.dim();
                *w = weight_init.initialize((fan_in, fan_out), fan_in, fan_out, rng)?;
            }
        }

        Ok(Network {
            layers,
            hidden_activation,
            output_activation,
            weight_init,
            loss,
            learning_rate,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].size()
    }

    /// Widths of every layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::size).collect()
    }

    /// Run one input through the network and return the `1 x output_size` output.
    pub fn forward_propagate(&mut self, input: ArrayView1<f32>) -> Result<Array2<f32>> {
        let n = self.input_size();
        if input.len() != n {
            return Err(FlagforgeError::dimension_mismatch(
                format!("input of length {}", n),
                format!("input of length {}", input.len()),
            ));
        }

        self.layers[0].activations = input.to_owned().insert_axis(ndarray::Axis(0));

        for i in 1..self.layers.len() {
            let contribution = self.layers[i - 1].compute_forward_contribution()?;
            self.layers[i].pre_activations = Some(contribution);
        }

        let last = self.layers.len() - 1;
        self.layers[last].compute_forward_contribution()
    }

    /// Forward pass returning the output as a flat vector.
    pub fn predict(&mut self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let output = self.forward_propagate(input)?;
        Ok(output.row(0).to_owned())
    }

    /// Backpropagate against a full `1 x output_size` target using the network's loss.
    /// Must follow a `forward_propagate` of the sample being trained.
    pub fn back_propagate(&mut self, target: &Array2<f32>) -> Result<()> {
        let last = self.layers.len() - 1;
        let output = self.layers[last].activations.clone();
        let output_gradient = self.loss.gradient(&output, target)?;
        self.propagate_from_output(output_gradient)
    }

    /// Backpropagate a single-action target.
    ///
    /// The target equals `output` everywhere except at `action`, where it is
    /// `target`; only that output node receives a non-zero error signal.
    pub fn back_propagate_masked(&mut self, output: &Array2<f32>, target: f32, action: usize) -> Result<()> {
        let width = self.output_size();
        if action >= width {
            return Err(FlagforgeError::InvalidAction { action, max_actions: width });
        }
        if output.dim() != (1, width) {
            return Err(FlagforgeError::dimension_mismatch(
                format!("output shape (1, {})", width),
                format!("{:?}", output.dim()),
            ));
        }

        let mut masked_target = output.clone();
        masked_target[[0, action]] = target;
        let output_gradient = self.loss.gradient(output, &masked_target)?;
        self.propagate_from_output(output_gradient)
    }

    fn propagate_from_output(&mut self, output_gradient: Array2<f32>) -> Result<()> {
        let last = self.layers.len() - 1;
        self.layers[last].gradient = Some(output_gradient);

        // Hidden layers only; the input layer has no gradient.
        for i in (1..last).rev() {
            let next_gradient = self.layers[i + 1]
                .gradient
                .as_ref()
                .ok_or_else(|| FlagforgeError::NumericalError(format!("layer {} has no gradient", i + 1)))?;
            let layer = &self.layers[i];
            let weights = layer
                .weights
                .as_ref()
                .ok_or_else(|| FlagforgeError::NumericalError(format!("layer {} has no weights", i)))?;
            let derivative = layer
                .activation_derivative
                .as_ref()
                .ok_or_else(|| FlagforgeError::NumericalError(format!("layer {} has no Fp", i)))?;

            // W excludes the bias row, which has no gradient target.
            let gradient = derivative * &next_gradient.dot(&weights.t());
            self.layers[i].gradient = Some(gradient);
        }
        Ok(())
    }

    /// Apply `[W ; b] -= learning_rate * [Z | 1]^T * G_next` to every non-output layer.
    ///
    /// All deltas are computed before any weight is touched.
    pub fn update_weights(&mut self, learning_rate: f32) -> Result<()> {
        let last = self.layers.len() - 1;
        let mut deltas = Vec::with_capacity(last);

        for i in 0..last {
            let next_gradient = self.layers[i + 1]
                .gradient
                .as_ref()
                .ok_or_else(|| FlagforgeError::NumericalError(format!("layer {} has no gradient", i + 1)))?;
            let augmented_input = with_bias_column(&self.layers[i].activations);
            deltas.push(augmented_input.t().dot(next_gradient));
        }

        for (layer, delta) in self.layers.iter_mut().zip(deltas.iter()) {
            layer.apply_augmented_delta(delta, learning_rate)?;
        }
        Ok(())
    }

    /// Forward, backpropagate and update on one sample; returns the loss before the update.
    pub fn train_step(&mut self, input: ArrayView1<f32>, target: &Array2<f32>) -> Result<f32> {
        let output = self.forward_propagate(input)?;
        let loss = self.loss.value(&output, target)?;
        self.back_propagate(target)?;
        self.update_weights(self.learning_rate)?;
        Ok(loss)
    }

    /// Gradient of the output layer from the most recent backpropagation.
    pub fn output_gradient(&self) -> Option<&Array2<f32>> {
        self.layers.last().and_then(|layer| layer.gradient.as_ref())
    }

    /// Copy every weight matrix and bias row from `other`, layer for layer.
    pub fn copy_weights_from(&mut self, other: &Network) -> Result<()> {
        if self.layer_sizes() != other.layer_sizes() {
            return Err(FlagforgeError::dimension_mismatch(
                format!("{:?}", self.layer_sizes()),
                format!("{:?}", other.layer_sizes()),
            ));
        }

        let last = self.layers.len() - 1;
        for (dst, src) in self.layers.iter_mut().zip(other.layers.iter()).take(last) {
            dst.weights.clone_from(&src.weights);
            dst.bias.clone_from(&src.bias);
        }
        Ok(())
    }

    /// Whether every weight and bias matches `other` exactly.
    pub fn weights_equal(&self, other: &Network) -> bool {
        self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(other.layers.iter())
                .all(|(a, b)| a.weights == b.weights && a.bias == b.bias)
    }

    /// Write the weights in the plain text format of [`crate::export::weights`].
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        weights::save_weights(self, path)
    }

    /// Load weights written by [`Network::save_weights`] into this network.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        weights::load_weights(self, path)
    }
}
