use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::agent::EpsilonSchedule;
use crate::error::{FlagforgeError, Result};
use crate::layers::WeightInit;
use crate::loss::Loss;

/// Hyperparameters of a [`crate::agent::DqnAgent`].
///
/// Missing fields fall back to [`AgentConfig::default`] when deserializing, so a
/// JSON file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Layer widths, input first. The last entry is the number of actions.
    pub layer_sizes: Vec<usize>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub weight_init: WeightInit,
    pub loss: Loss,
    pub learning_rate: f32,
    /// Discount applied to the target network's best next-state value
    pub discount_rate: f32,
    pub epsilon: EpsilonSchedule,
    /// Learning steps between target network synchronizations
    pub copy_period: usize,
    pub buffer_size: usize,
    /// Steps per episode; the last one is terminal
    pub episode_length: usize,
    pub num_episodes: usize,
    /// Forbid applying the same action twice in one episode
    pub exclusive_actions: bool,
    /// Action that is always legal and never penalized
    pub noop_action: Option<usize>,
    /// Reward for repeating an action when repeats are allowed. On the
    /// terminal step it is added to the measured reward rather than replacing it.
    pub repeat_penalty: f32,
    /// Extra attempts for a failing environment call before the step is skipped
    pub max_env_retries: usize,
    /// Pick a random program from the pool at every episode start
    pub reselect_program: bool,
    pub seed: u64,
    pub metrics_history: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            layer_sizes: vec![7, 30, 30, 30, 8],
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::Linear,
            weight_init: WeightInit::XavierUniform,
            loss: Loss::default(),
            learning_rate: 0.001,
            discount_rate: 0.9,
            epsilon: EpsilonSchedule::default(),
            copy_period: 4,
            buffer_size: 300,
            episode_length: 7,
            num_episodes: 100,
            exclusive_actions: true,
            noop_action: None,
            repeat_penalty: -0.1,
            max_env_retries: 1,
            reselect_program: true,
            seed: 321,
            metrics_history: 1000,
        }
    }
}

impl AgentConfig {
    pub fn num_actions(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    pub fn state_size(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    /// Check every field that would otherwise fail later, mid-training.
    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.len() < 2 {
            return Err(FlagforgeError::invalid_parameter(
                "layer_sizes",
                "Must have at least an input and an output layer",
            ));
        }
        if self.layer_sizes.iter().any(|&size| size == 0) {
            return Err(FlagforgeError::invalid_parameter(
                "layer_sizes",
                "Every layer needs at least one neuron",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(FlagforgeError::invalid_parameter("learning_rate", "Must be positive"));
        }
        if !(0.0..=1.0).contains(&self.discount_rate) {
            return Err(FlagforgeError::invalid_parameter("discount_rate", "Must be between 0 and 1"));
        }
        for (name, value) in [
            ("copy_period", self.copy_period),
            ("buffer_size", self.buffer_size),
            ("episode_length", self.episode_length),
            ("metrics_history", self.metrics_history),
        ] {
            if value == 0 {
                return Err(FlagforgeError::invalid_parameter(name, "Must be greater than 0"));
            }
        }
        if !self.repeat_penalty.is_finite() {
            return Err(FlagforgeError::invalid_parameter("repeat_penalty", "Must be finite"));
        }

        let num_actions = self.num_actions();
        if let Some(noop) = self.noop_action {
            if noop >= num_actions {
                return Err(FlagforgeError::InvalidAction { action: noop, max_actions: num_actions });
            }
        }
        if self.exclusive_actions && self.noop_action.is_none() && self.episode_length > num_actions {
            return Err(FlagforgeError::invalid_parameter(
                "episode_length".to_string(),
                format!(
                    "Exclusive episodes of {} steps need a no-op action or at least as many actions, got {}",
                    self.episode_length, num_actions
                ),
            ));
        }

        self.epsilon.validate()?;
        self.loss.validate()?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}
