use std::collections::VecDeque;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;

/// Histories recorded during training. Each history keeps at most
/// `history_size` entries, dropping the oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Loss of each learning step
    pub losses: VecDeque<f32>,

    /// Total reward per episode
    pub episode_rewards: VecDeque<f32>,

    /// Completed steps per episode
    pub episode_lengths: VecDeque<usize>,

    /// Bellman targets used by learning steps
    pub q_targets: VecDeque<f32>,

    /// Exploration rate at each episode start
    pub epsilons: VecDeque<f32>,

    /// Steps abandoned after environment failures
    pub skipped_steps: usize,

    /// Online-to-target weight copies
    pub target_syncs: usize,
}

impl TrainingMetrics {
    pub fn new(history_size: usize) -> Self {
        TrainingMetrics {
            losses: VecDeque::with_capacity(history_size),
            episode_rewards: VecDeque::with_capacity(history_size),
            episode_lengths: VecDeque::with_capacity(history_size),
            q_targets: VecDeque::with_capacity(history_size),
            epsilons: VecDeque::with_capacity(history_size),
            skipped_steps: 0,
            target_syncs: 0,
        }
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, limit: usize) {
    if history.len() >= limit {
        history.pop_front();
    }
    history.push_back(value);
}

fn recent_mean<'a>(values: impl DoubleEndedIterator<Item = &'a f32> + ExactSizeIterator, window: usize) -> Option<f32> {
    let n = window.min(values.len());
    if n == 0 {
        return None;
    }
    Some(values.rev().take(n).sum::<f32>() / n as f32)
}

/// Tracks metrics during training
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_reward: f32,
    current_episode_length: usize,
    episode_count: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        MetricsTracker {
            metrics: TrainingMetrics::new(history_size),
            history_size,
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
        }
    }

    pub fn record_loss(&mut self, loss: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
    }

    pub fn record_q_target(&mut self, target: f32) {
        push_bounded(&mut self.metrics.q_targets, target, self.history_size);
    }

    pub fn record_epsilon(&mut self, epsilon: f32) {
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
    }

    pub fn record_skipped_step(&mut self) {
        self.metrics.skipped_steps += 1;
    }

    pub fn record_target_sync(&mut self) {
        self.metrics.target_syncs += 1;
    }

    pub fn start_episode(&mut self) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
    }

    /// Record one completed step within the current episode
    pub fn step(&mut self, reward: f32) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    /// Close the current episode and return its total reward
    pub fn end_episode(&mut self) -> f32 {
        let reward = self.current_episode_reward;
        push_bounded(&mut self.metrics.episode_rewards, reward, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, self.current_episode_length, self.history_size);
        self.episode_count += 1;
        reward
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Mean of the last `window` losses
    pub fn avg_loss(&self, window: usize) -> Option<f32> {
        recent_mean(self.metrics.losses.iter(), window)
    }

    /// Mean of the last `window` episode rewards
    pub fn avg_episode_reward(&self, window: usize) -> Option<f32> {
        recent_mean(self.metrics.episode_rewards.iter(), window)
    }

    pub fn clear(&mut self) {
        *self = MetricsTracker::new(self.history_size);
    }

    /// Save metrics to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics written by [`MetricsTracker::save`]
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.metrics = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}
