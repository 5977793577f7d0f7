use std::path::Path;

use crate::activations::Activation;
use crate::agent::{AgentConfig, DqnAgent, EpsilonSchedule};
use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};
use crate::layers::WeightInit;
use crate::loss::Loss;

/// Builder for [`DqnAgent`]. Starts from [`AgentConfig::default`] or a JSON
/// file and validates everything in [`AgentBuilder::build`].
///
/// ```rust,no_run
/// use flagforge::builders::AgentBuilder;
/// use flagforge::agent::EpsilonSchedule;
/// # use flagforge::environment::Environment;
/// # fn run<E: Environment>(env: E) -> flagforge::error::Result<()> {
/// let mut agent = AgentBuilder::new()
///     .layer_sizes(&[7, 30, 30, 30, 12])
///     .epsilon(EpsilonSchedule::LinearDecay { start: 1.0, end: 0.05, decay_episodes: 80 })
///     .copy_period(4)
///     .environment(env)
///     .programs(vec!["matmul".into(), "qsort".into()])
///     .build()?;
/// agent.train()?;
/// # Ok(())
/// # }
/// ```
pub struct AgentBuilder<E: Environment> {
    config: AgentConfig,
    env: Option<E>,
    programs: Vec<String>,
}

impl<E: Environment> AgentBuilder<E> {
    pub fn new() -> Self {
        Self::from_config(AgentConfig::default())
    }

    pub fn from_config(config: AgentConfig) -> Self {
        AgentBuilder { config, env: None, programs: Vec::new() }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_config(AgentConfig::from_json_file(path)?))
    }

    pub fn layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.config.layer_sizes = sizes.to_vec();
        self
    }

    pub fn activations(mut self, hidden: Activation, output: Activation) -> Self {
        self.config.hidden_activation = hidden;
        self.config.output_activation = output;
        self
    }

    pub fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.config.weight_init = weight_init;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.config.loss = loss;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    pub fn discount_rate(mut self, discount_rate: f32) -> Self {
        self.config.discount_rate = discount_rate;
        self
    }

    pub fn epsilon(mut self, schedule: EpsilonSchedule) -> Self {
        self.config.epsilon = schedule;
        self
    }

    pub fn copy_period(mut self, period: usize) -> Self {
        self.config.copy_period = period;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn episode_length(mut self, length: usize) -> Self {
        self.config.episode_length = length;
        self
    }

    pub fn num_episodes(mut self, episodes: usize) -> Self {
        self.config.num_episodes = episodes;
        self
    }

    pub fn exclusive_actions(mut self, exclusive: bool) -> Self {
        self.config.exclusive_actions = exclusive;
        self
    }

    pub fn noop_action(mut self, action: Option<usize>) -> Self {
        self.config.noop_action = action;
        self
    }

    pub fn repeat_penalty(mut self, penalty: f32) -> Self {
        self.config.repeat_penalty = penalty;
        self
    }

    pub fn max_env_retries(mut self, retries: usize) -> Self {
        self.config.max_env_retries = retries;
        self
    }

    pub fn reselect_program(mut self, reselect: bool) -> Self {
        self.config.reselect_program = reselect;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn environment(mut self, env: E) -> Self {
        self.env = Some(env);
        self
    }

    pub fn programs(mut self, programs: Vec<String>) -> Self {
        self.programs = programs;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn build(self) -> Result<DqnAgent<E>> {
        let env = self
            .env
            .ok_or_else(|| FlagforgeError::invalid_parameter("environment", "Environment not specified"))?;
        DqnAgent::new(self.config, env, self.programs)
    }
}

impl<E: Environment> Default for AgentBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
