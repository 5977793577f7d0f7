use std::path::Path;

use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::{policy, AgentConfig};
use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};
use crate::metrics::MetricsTracker;
use crate::network::Network;
use crate::replay_buffer::{ReplayBuffer, Transition};

/// What happened during one completed step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub action: usize,
    pub reward: f32,
    pub terminal: bool,
    /// Loss of the learning update made during this step
    pub loss: f32,
    /// Whether the target network was synchronized after this step
    pub synced: bool,
}

/// Summary of one episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub program: Option<String>,
    /// Actions of the completed steps, in order
    pub actions: Vec<usize>,
    pub total_reward: f32,
    /// Reward measured at the terminal step, if that step completed
    pub terminal_reward: Option<f32>,
    pub skipped_steps: usize,
}

/// Result of [`DqnAgent::train`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub episodes: usize,
    pub steps: usize,
    pub skipped_steps: usize,
    pub target_syncs: usize,
    pub mean_reward: f32,
    pub best_reward: Option<f32>,
    pub best_actions: Vec<usize>,
    pub best_program: Option<String>,
}

/// Deep Q-Network agent choosing one action per step from a fixed action set.
///
/// Every step runs `SAMPLE -> STORE -> LEARN -> SYNC`:
///
/// - **Sample**: read the state, pick an epsilon-greedy legal action from the
///   online network, apply it and read the next state. Only the last step of an
///   episode measures a reward.
/// - **Store**: push the transition into the replay buffer.
/// - **Learn**: train the online network on one uniformly sampled transition
///   against `r + discount * max Q_target(s')`, or `r` when terminal. Only the
///   output of the sampled action receives an error signal.
/// - **Sync**: every `copy_period` learning steps, copy the online weights into
///   the target network. The target is never trained directly.
///
/// ```rust,no_run
/// use flagforge::agent::{AgentConfig, DqnAgent};
/// # use flagforge::environment::Environment;
/// # fn run<E: Environment>(env: E) -> flagforge::error::Result<()> {
/// let config = AgentConfig {
///     layer_sizes: vec![7, 30, 30, 30, 8],
///     num_episodes: 50,
///     ..AgentConfig::default()
/// };
/// let mut agent = DqnAgent::new(config, env, vec!["matmul".to_string()])?;
/// let report = agent.train()?;
/// println!("best reward {:?} with {:?}", report.best_reward, report.best_actions);
/// # Ok(())
/// # }
/// ```
pub struct DqnAgent<E: Environment> {
    /// Network that selects actions and is trained
    pub online: Network,

    /// Network that evaluates next states; changed only by synchronization
    pub target: Network,

    buffer: ReplayBuffer,
    config: AgentConfig,
    env: E,
    programs: Vec<String>,
    rng: StdRng,
    applied: Vec<bool>,
    episode: usize,
    learn_steps: usize,
    metrics: MetricsTracker,
}

impl<E: Environment> DqnAgent<E> {
    /// Create an agent. The target network starts as an exact copy of the online one.
    pub fn new(config: AgentConfig, env: E, programs: Vec<String>) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let online = Network::new(
            &config.layer_sizes,
            (config.hidden_activation, config.output_activation),
            config.weight_init,
            config.loss,
            config.learning_rate,
            &mut rng,
        )?;
        let target = online.clone();

        Ok(DqnAgent {
            online,
            target,
            buffer: ReplayBuffer::new(config.buffer_size),
            applied: vec![false; config.num_actions()],
            metrics: MetricsTracker::new(config.metrics_history),
            config,
            env,
            programs,
            rng,
            episode: 0,
            learn_steps: 0,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn programs(&self) -> &[String] {
        &self.programs
    }

    pub fn num_actions(&self) -> usize {
        self.applied.len()
    }

    /// Episodes started so far
    pub fn episode(&self) -> usize {
        self.episode
    }

    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    /// Actions applied since the current episode started, by index
    pub fn applied_actions(&self) -> Vec<usize> {
        self.applied
            .iter()
            .enumerate()
            .filter(|&(_, &applied)| applied)
            .map(|(action, _)| action)
            .collect()
    }

    /// Legality mask for the next action. With exclusive actions, an action
    /// already applied this episode is illegal unless it is the no-op.
    pub fn legal_actions(&self) -> Vec<bool> {
        self.applied
            .iter()
            .enumerate()
            .map(|(action, &applied)| {
                !self.config.exclusive_actions || !applied || Some(action) == self.config.noop_action
            })
            .collect()
    }

    /// Epsilon-greedy choice among legal actions for `state`.
    pub fn select_action(&mut self, state: ArrayView1<f32>, epsilon: f32) -> Result<usize> {
        let legal = self.legal_actions();
        if policy::explores(epsilon, &mut self.rng) {
            policy::random_legal_action(&legal, &mut self.rng)
        } else {
            let q_values = self.online.predict(state)?;
            policy::greedy_legal_action(q_values.view(), &legal)
        }
    }

    /// Reset the environment for a new episode and clear the applied actions.
    pub fn begin_episode(&mut self) -> Result<Option<String>> {
        let program = if self.programs.is_empty() {
            None
        } else if self.config.reselect_program {
            Some(self.programs[self.rng.gen_range(0..self.programs.len())].clone())
        } else if self.episode == 0 {
            Some(self.programs[0].clone())
        } else {
            None
        };

        self.applied.iter_mut().for_each(|applied| *applied = false);
        self.with_retries("reset", |env| env.reset(program.as_deref()))?;
        Ok(program)
    }

    /// Run one full step: sample, store, learn and possibly sync.
    ///
    /// `step_index` is the position within the episode; the step at
    /// `episode_length - 1` is terminal.
    pub fn step(&mut self, step_index: usize) -> Result<StepOutcome> {
        let terminal = step_index + 1 >= self.config.episode_length;

        // Sample
        let state = self.read_state()?;
        let epsilon = self.config.epsilon.value(self.episode);
        let action = self.select_action(state.view(), epsilon)?;
        let repeated = self.applied[action] && Some(action) != self.config.noop_action;

        self.with_retries("apply", |env| env.apply(action))?;
        self.applied[action] = true;
        let next_state = self.read_state()?;

        let mut reward = if terminal {
            self.with_retries("measure_terminal_reward", |env| env.measure_terminal_reward())?
        } else {
            0.0
        };
        if repeated {
            reward += self.config.repeat_penalty;
        }
        log::debug!("step {}: action {} reward {:.4}", step_index, action, reward);

        // Store
        self.buffer.push(Transition::new(state, action, reward, next_state, terminal));

        // Learn
        let loss = self.learn()?;

        // Sync
        let synced = self.learn_steps % self.config.copy_period == 0;
        if synced {
            self.sync_target()?;
        }

        Ok(StepOutcome { action, reward, terminal, loss, synced })
    }

    /// Train the online network on one uniformly sampled transition and
    /// return the loss before the update.
    pub fn learn(&mut self) -> Result<f32> {
        let transition = self.buffer.sample_uniform(&mut self.rng)?.clone();
        let target_value = self.bellman_target(&transition)?;

        let output = self.online.forward_propagate(transition.state.view())?;
        self.online.back_propagate_masked(&output, target_value, transition.action)?;

        let mut masked_target = output.clone();
        masked_target[[0, transition.action]] = target_value;
        let loss = self.online.loss.value(&output, &masked_target)?;

        self.online.update_weights(self.config.learning_rate)?;
        self.learn_steps += 1;

        self.metrics.record_loss(loss);
        self.metrics.record_q_target(target_value);
        Ok(loss)
    }

    /// `reward` for terminal transitions, otherwise
    /// `reward + discount * max_a Q_target(next_state)[a]`.
    pub fn bellman_target(&mut self, transition: &Transition) -> Result<f32> {
        if transition.terminal {
            return Ok(transition.reward);
        }

        let next_q = self.target.predict(transition.next_state.view())?;
        let best_next = next_q.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !best_next.is_finite() {
            return Err(FlagforgeError::NumericalError(format!(
                "target network produced {} for the next state",
                best_next
            )));
        }
        Ok(transition.reward + self.config.discount_rate * best_next)
    }

    /// Copy every online weight matrix and bias row into the target network.
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.copy_weights_from(&self.online)?;
        self.metrics.record_target_sync();
        log::debug!("target network synchronized after {} learning steps", self.learn_steps);
        Ok(())
    }

    /// Run one episode of `episode_length` steps.
    ///
    /// Steps that fail in a recoverable way are skipped and counted; any other
    /// error ends training.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let episode = self.episode;
        let epsilon = self.config.epsilon.value(episode);
        self.metrics.record_epsilon(epsilon);
        self.metrics.start_episode();

        let mut summary = EpisodeSummary {
            episode,
            program: None,
            actions: Vec::with_capacity(self.config.episode_length),
            total_reward: 0.0,
            terminal_reward: None,
            skipped_steps: 0,
        };

        match self.begin_episode() {
            Ok(program) => {
                summary.program = program;
                for step_index in 0..self.config.episode_length {
                    match self.step(step_index) {
                        Ok(outcome) => {
                            self.metrics.step(outcome.reward);
                            summary.actions.push(outcome.action);
                            summary.total_reward += outcome.reward;
                            if outcome.terminal {
                                summary.terminal_reward = Some(outcome.reward);
                            }
                        }
                        Err(err) if err.is_recoverable() => {
                            log::warn!("episode {}: skipping step {}: {}", episode, step_index, err);
                            self.metrics.record_skipped_step();
                            summary.skipped_steps += 1;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
            Err(err) if err.is_recoverable() => {
                log::warn!("episode {}: environment reset failed, skipping episode: {}", episode, err);
                for _ in 0..self.config.episode_length {
                    self.metrics.record_skipped_step();
                }
                summary.skipped_steps = self.config.episode_length;
            }
            Err(err) => return Err(err),
        }

        self.metrics.end_episode();
        self.episode += 1;

        log::info!(
            "episode {} ({}): reward {:.4}, actions {:?}, epsilon {:.3}",
            episode,
            summary.program.as_deref().unwrap_or("current program"),
            summary.total_reward,
            summary.actions,
            epsilon
        );
        Ok(summary)
    }

    /// Run `num_episodes` episodes and report the best action sequence found.
    pub fn train(&mut self) -> Result<TrainingReport> {
        let syncs_before = self.metrics.metrics().target_syncs;
        let mut report = TrainingReport {
            episodes: 0,
            steps: 0,
            skipped_steps: 0,
            target_syncs: 0,
            mean_reward: 0.0,
            best_reward: None,
            best_actions: Vec::new(),
            best_program: None,
        };
        let mut reward_sum = 0.0;

        for _ in 0..self.config.num_episodes {
            let summary = self.run_episode()?;
            report.episodes += 1;
            report.steps += summary.actions.len();
            report.skipped_steps += summary.skipped_steps;
            reward_sum += summary.total_reward;

            if summary.terminal_reward.is_some()
                && report.best_reward.map_or(true, |best| summary.total_reward > best)
            {
                report.best_reward = Some(summary.total_reward);
                report.best_actions = summary.actions;
                report.best_program = summary.program;
            }
        }

        report.target_syncs = self.metrics.metrics().target_syncs - syncs_before;
        if report.episodes > 0 {
            report.mean_reward = reward_sum / report.episodes as f32;
        }

        log::info!(
            "training finished: {} episodes, {} steps ({} skipped), {} target syncs, mean reward {:.4}",
            report.episodes,
            report.steps,
            report.skipped_steps,
            report.target_syncs,
            report.mean_reward
        );
        Ok(report)
    }

    /// Greedily apply `steps` actions with the current online network, without
    /// exploring, storing or learning. Stops early when no action is legal.
    pub fn select_actions_via_policy(&mut self, program: Option<&str>, steps: usize) -> Result<Vec<usize>> {
        self.applied.iter_mut().for_each(|applied| *applied = false);
        self.with_retries("reset", |env| env.reset(program))?;

        let mut actions = Vec::with_capacity(steps);
        for _ in 0..steps {
            let legal = self.legal_actions();
            if !legal.contains(&true) {
                break;
            }

            let state = self.read_state()?;
            let q_values = self.online.predict(state.view())?;
            let action = policy::greedy_legal_action(q_values.view(), &legal)?;

            self.with_retries("apply", |env| env.apply(action))?;
            self.applied[action] = true;
            actions.push(action);
        }
        Ok(actions)
    }

    /// Write the online network's weights.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.online.save_weights(path)
    }

    /// Load weights into the online network and copy them into the target.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.online.load_weights(path)?;
        self.target.copy_weights_from(&self.online)
    }

    fn read_state(&mut self) -> Result<Array1<f32>> {
        let state = self.with_retries("state", |env| env.state())?;
        let expected = self.online.input_size();
        if state.len() != expected {
            return Err(FlagforgeError::dimension_mismatch(
                format!("state of length {}", expected),
                format!("state of length {}", state.len()),
            ));
        }
        Ok(state)
    }

    /// Call into the environment, retrying environment failures and timeouts
    /// up to `max_env_retries` extra times.
    fn with_retries<T>(&mut self, call: &str, mut op: impl FnMut(&mut E) -> Result<T>) -> Result<T> {
        let max_retries = self.config.max_env_retries;
        let mut attempt = 0;
        loop {
            match op(&mut self.env) {
                Ok(value) => return Ok(value),
                Err(err @ (FlagforgeError::EnvironmentFailure(_) | FlagforgeError::Timeout(_)))
                    if attempt < max_retries =>
                {
                    attempt += 1;
                    log::warn!("{} failed ({}), retry {}/{}", call, err, attempt, max_retries);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
