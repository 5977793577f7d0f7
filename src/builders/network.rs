use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::error::{FlagforgeError, Result};
use crate::layers::WeightInit;
use crate::loss::Loss;
use crate::network::Network;

/// Builder for constructing networks with a fluent API
pub struct NetworkBuilder {
    layer_sizes: Vec<usize>,
    hidden_activation: Activation,
    output_activation: Activation,
    weight_init: WeightInit,
    loss: Loss,
    learning_rate: f32,
    seed: u64,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        NetworkBuilder {
            layer_sizes: Vec::new(),
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::Linear,
            weight_init: WeightInit::default(),
            loss: Loss::default(),
            learning_rate: 0.001,
            seed: 0,
        }
    }

    /// Append one layer of `size` neurons
    pub fn add_layer(mut self, size: usize) -> Self {
        self.layer_sizes.push(size);
        self
    }

    /// Set every layer width at once, input first
    pub fn layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.layer_sizes = sizes.to_vec();
        self
    }

    pub fn hidden_activation(mut self, activation: Activation) -> Self {
        self.hidden_activation = activation;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.output_activation = activation;
        self
    }

    pub fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = weight_init;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Seed for weight initialization
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<Network> {
        if self.layer_sizes.len() < 2 {
            return Err(FlagforgeError::invalid_parameter(
                "layer_sizes",
                "Must have at least 2 layer sizes",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(FlagforgeError::invalid_parameter("learning_rate", "Must be positive"));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        Network::new(
            &self.layer_sizes,
            (self.hidden_activation, self.output_activation),
            self.weight_init,
            self.loss,
            self.learning_rate,
            &mut rng,
        )
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
