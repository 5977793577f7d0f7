use ndarray::{array, Array1};
use tempfile::tempdir;

use crate::agent::{AgentConfig, DqnAgent, EpsilonSchedule};
use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};
use crate::replay_buffer::Transition;

/// Deterministic environment: the state encodes how many actions were applied,
/// the terminal reward is fixed, and measurement can be made to fail.
struct ScriptedEnv {
    state_size: usize,
    applied: Vec<usize>,
    reward: f32,
    measure_failures: usize,
    measure_calls: usize,
    resets: Vec<Option<String>>,
    wrong_state_size: bool,
}

impl ScriptedEnv {
    fn new(state_size: usize, reward: f32) -> Self {
        ScriptedEnv {
            state_size,
            applied: Vec::new(),
            reward,
            measure_failures: 0,
            measure_calls: 0,
            resets: Vec::new(),
            wrong_state_size: false,
        }
    }
}

impl Environment for ScriptedEnv {
    fn state(&mut self) -> Result<Array1<f32>> {
        let size = if self.wrong_state_size { self.state_size + 1 } else { self.state_size };
        let mut state = Array1::zeros(size);
        state[0] = self.applied.len() as f32 / 10.0;
        Ok(state)
    }

    fn apply(&mut self, action: usize) -> Result<()> {
        self.applied.push(action);
        Ok(())
    }

    fn measure_terminal_reward(&mut self) -> Result<f32> {
        self.measure_calls += 1;
        if self.measure_failures > 0 {
            self.measure_failures -= 1;
            return Err(FlagforgeError::EnvironmentFailure("benchmark crashed".into()));
        }
        Ok(self.reward)
    }

    fn reset(&mut self, program: Option<&str>) -> Result<()> {
        self.applied.clear();
        self.resets.push(program.map(str::to_string));
        Ok(())
    }
}

fn config(layer_sizes: &[usize], episode_length: usize) -> AgentConfig {
    AgentConfig {
        layer_sizes: layer_sizes.to_vec(),
        episode_length,
        learning_rate: 0.05,
        seed: 17,
        ..AgentConfig::default()
    }
}

fn agent(config: AgentConfig) -> DqnAgent<ScriptedEnv> {
    let state_size = config.state_size();
    DqnAgent::new(config, ScriptedEnv::new(state_size, 0.5), vec!["matmul".to_string()]).unwrap()
}

#[test]
fn test_greedy_selection_is_deterministic() {
    let mut a = agent(config(&[3, 8, 4], 3));
    let mut b = agent(config(&[3, 8, 4], 3));
    let state = array![0.2, -0.4, 0.9];

    let first = a.select_action(state.view(), 0.0).unwrap();
    for _ in 0..20 {
        assert_eq!(a.select_action(state.view(), 0.0).unwrap(), first);
    }
    assert_eq!(b.select_action(state.view(), 0.0).unwrap(), first);
}

#[test]
fn test_full_exploration_is_near_uniform() {
    let mut agent = agent(config(&[3, 8, 4], 3));
    let state = array![0.0, 0.0, 0.0];
    let mut counts = [0usize; 4];

    for _ in 0..4000 {
        counts[agent.select_action(state.view(), 1.0).unwrap()] += 1;
    }

    for count in counts {
        let ratio = count as f32 / 1000.0;
        assert!(ratio > 0.8 && ratio < 1.2, "counts {:?}", counts);
    }
}

#[test]
fn test_target_changes_only_at_sync() {
    let mut agent = agent(AgentConfig { copy_period: 3, exclusive_actions: false, ..config(&[3, 8, 4], 3) });
    let initial_target = agent.target.clone();
    assert!(agent.target.weights_equal(&agent.online));

    agent.begin_episode().unwrap();
    for step in 0..2 {
        let outcome = agent.step(step).unwrap();
        assert!(!outcome.synced);
        assert!(agent.target.weights_equal(&initial_target));
    }
    assert!(!agent.online.weights_equal(&initial_target));

    let outcome = agent.step(2).unwrap();
    assert!(outcome.synced && outcome.terminal);
    assert!(agent.target.weights_equal(&agent.online));
    assert_eq!(agent.metrics().metrics().target_syncs, 1);
}

#[test]
fn test_bellman_target() {
    let mut agent = agent(AgentConfig { discount_rate: 0.9, ..config(&[3, 8, 4], 3) });

    let terminal = Transition::new(array![0.0, 0.0, 0.0], 1, 0.37, array![1.0, 1.0, 1.0], true);
    assert_eq!(agent.bellman_target(&terminal).unwrap(), 0.37);

    let next_state = array![0.5, 0.1, -0.3];
    let open = Transition::new(array![0.0, 0.0, 0.0], 1, 0.25, next_state.clone(), false);
    let best = agent.target.predict(next_state.view()).unwrap().fold(f32::NEG_INFINITY, |m, &q| m.max(q));
    let y = agent.bellman_target(&open).unwrap();
    assert!((y - (0.25 + 0.9 * best)).abs() < 1e-6);
}

#[test]
fn test_exclusive_episode_uses_each_action_once() {
    let mut agent = agent(AgentConfig {
        epsilon: EpsilonSchedule::Constant { epsilon: 1.0 },
        ..config(&[3, 8, 4], 4)
    });

    for _ in 0..10 {
        let summary = agent.run_episode().unwrap();
        let mut actions = summary.actions.clone();
        actions.sort_unstable();
        assert_eq!(actions, vec![0, 1, 2, 3]);
        assert_eq!(summary.terminal_reward, Some(0.5));
    }
}

#[test]
fn test_noop_stays_legal_and_unpenalized() {
    let mut agent = agent(AgentConfig {
        epsilon: EpsilonSchedule::Constant { epsilon: 1.0 },
        noop_action: Some(1),
        repeat_penalty: -0.1,
        ..config(&[3, 8, 2], 5)
    });

    let summary = agent.run_episode().unwrap();
    let used_zero = summary.actions.iter().filter(|&&a| a == 0).count();
    assert!(used_zero <= 1);
    assert_eq!(agent.legal_actions(), vec![used_zero == 0, true]);

    let rewards: Vec<f32> = agent.buffer().iter().map(|t| t.reward).collect();
    assert_eq!(rewards, vec![0.0, 0.0, 0.0, 0.0, 0.5]);
}

#[test]
fn test_repeat_penalty_when_not_exclusive() {
    let mut agent = agent(AgentConfig {
        exclusive_actions: false,
        repeat_penalty: -0.1,
        ..config(&[3, 4, 1], 3)
    });

    let summary = agent.run_episode().unwrap();
    assert_eq!(summary.actions, vec![0, 0, 0]);

    let rewards: Vec<f32> = agent.buffer().iter().map(|t| t.reward).collect();
    assert_eq!(rewards[0], 0.0);
    assert_eq!(rewards[1], -0.1);
    assert!((rewards[2] - 0.4).abs() < 1e-6);
    assert!((summary.total_reward - 0.3).abs() < 1e-6);
}

#[test]
fn test_persistent_failure_skips_step() {
    let mut agent = agent(AgentConfig { max_env_retries: 1, ..config(&[3, 8, 4], 3) });
    agent.env_mut().measure_failures = usize::MAX;

    let summary = agent.run_episode().unwrap();
    assert_eq!(summary.skipped_steps, 1);
    assert_eq!(summary.terminal_reward, None);
    assert_eq!(agent.env().measure_calls, 2);
    // The failed terminal step stored nothing and learned nothing.
    assert_eq!(agent.buffer().len(), 2);
    assert_eq!(agent.learn_steps(), 2);
    assert_eq!(agent.metrics().metrics().skipped_steps, 1);
}

#[test]
fn test_transient_failure_is_retried() {
    let mut agent = agent(AgentConfig { max_env_retries: 1, ..config(&[3, 8, 4], 3) });
    agent.env_mut().measure_failures = 1;

    let summary = agent.run_episode().unwrap();
    assert_eq!(summary.skipped_steps, 0);
    assert_eq!(summary.terminal_reward, Some(0.5));
    assert_eq!(agent.buffer().len(), 3);
}

#[test]
fn test_malformed_state_is_skipped() {
    let mut agent = agent(config(&[3, 8, 4], 3));
    agent.env_mut().wrong_state_size = true;

    let summary = agent.run_episode().unwrap();
    assert_eq!(summary.skipped_steps, 3);
    assert!(agent.buffer().is_empty());
}

#[test]
fn test_train_report() {
    let mut agent = agent(AgentConfig { num_episodes: 5, copy_period: 2, ..config(&[3, 8, 4], 3) });
    let report = agent.train().unwrap();

    assert_eq!(report.episodes, 5);
    assert_eq!(report.steps, 15);
    assert_eq!(report.skipped_steps, 0);
    assert_eq!(report.target_syncs, 7);
    assert_eq!(report.best_reward, Some(0.5));
    assert_eq!(report.best_actions.len(), 3);
    assert_eq!(report.best_program.as_deref(), Some("matmul"));
    assert_eq!(agent.metrics().episode_count(), 5);
    assert_eq!(agent.env().resets.len(), 5);
}

#[test]
fn test_policy_rollout_does_not_learn() {
    let mut agent = agent(config(&[3, 8, 4], 3));
    let before = agent.online.clone();

    let actions = agent.select_actions_via_policy(Some("qsort"), 6).unwrap();
    assert_eq!(actions.len(), 4);
    let mut sorted = actions.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3]);

    assert!(agent.online.weights_equal(&before));
    assert!(agent.buffer().is_empty());
    assert_eq!(agent.env().resets, vec![Some("qsort".to_string())]);
}

#[test]
fn test_weights_round_trip_through_agent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("online.txt");

    let mut trained = agent(AgentConfig { num_episodes: 3, ..config(&[3, 8, 4], 3) });
    trained.train().unwrap();
    trained.save_weights(&path).unwrap();

    let mut fresh = agent(AgentConfig { seed: 99, ..config(&[3, 8, 4], 3) });
    fresh.load_weights(&path).unwrap();
    assert!(fresh.online.weights_equal(&trained.online));
    assert!(fresh.target.weights_equal(&fresh.online));
}
