use rand::seq::SliceRandom;
use rand::Rng;

use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};

/// Best action set found by [`random_search`].
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Best action set, in the order it was applied
    pub best_actions: Vec<usize>,
    /// Reward of `best_actions`, `None` when every measurement failed
    pub best_reward: Option<f32>,
    pub evaluations: usize,
    pub failures: usize,
}

/// Apply `actions` from a fresh episode and measure the result.
fn evaluate<E: Environment + ?Sized>(env: &mut E, program: Option<&str>, actions: &[usize]) -> Result<f32> {
    env.reset(program)?;
    for &action in actions {
        env.apply(action)?;
    }
    env.measure_terminal_reward()
}

/// Random search over action subsets.
///
/// Each iteration applies a random subset of `0..num_actions` of random size
/// below `num_actions`, in random order, and keeps the best reward. The first
/// iteration resets onto `program`; later ones stay on it. Recoverable failures
/// are counted and skipped.
pub fn random_search<E, R>(
    env: &mut E,
    program: Option<&str>,
    num_actions: usize,
    iterations: usize,
    rng: &mut R,
) -> Result<SearchResult>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    if num_actions == 0 {
        return Err(FlagforgeError::invalid_parameter("num_actions", "Must be greater than 0"));
    }

    let mut result = SearchResult {
        best_actions: Vec::new(),
        best_reward: None,
        evaluations: 0,
        failures: 0,
    };
    let mut pool: Vec<usize> = (0..num_actions).collect();

    for iteration in 0..iterations {
        pool.shuffle(rng);
        let size = rng.gen_range(0..num_actions);
        let candidate = &pool[..size];
        let target = if iteration == 0 { program } else { None };

        match evaluate(env, target, candidate) {
            Ok(reward) => {
                result.evaluations += 1;
                if result.best_reward.map_or(true, |best| reward > best) {
                    log::debug!("random search iteration {}: {:?} -> {:.4}", iteration, candidate, reward);
                    result.best_reward = Some(reward);
                    result.best_actions = candidate.to_vec();
                }
            }
            Err(err) if err.is_recoverable() => {
                log::warn!("random search iteration {} failed: {}", iteration, err);
                result.failures += 1;
            }
            Err(err) => return Err(err),
        }
    }

    log::info!(
        "random search: best {:?} with {:?} after {} evaluations ({} failed)",
        result.best_reward,
        result.best_actions,
        result.evaluations,
        result.failures
    );
    Ok(result)
}

/// Reward of every prefix of `actions`: entry `i` measures `actions[..=i]`.
/// A failed measurement yields `None` for that prefix.
pub fn iterative_sweep<E>(env: &mut E, program: Option<&str>, actions: &[usize]) -> Result<Vec<Option<f32>>>
where
    E: Environment + ?Sized,
{
    let mut rewards = Vec::with_capacity(actions.len());
    for end in 1..=actions.len() {
        let target = if end == 1 { program } else { None };
        match evaluate(env, target, &actions[..end]) {
            Ok(reward) => rewards.push(Some(reward)),
            Err(err) if err.is_recoverable() => {
                log::warn!("sweep over {:?} failed: {}", &actions[..end], err);
                rewards.push(None);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(rewards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Reward is the number of distinct even actions applied.
    /// Applying action 3 makes the measurement fail.
    struct EvenCounter {
        applied: Vec<usize>,
        resets: Vec<Option<String>>,
    }

    impl Environment for EvenCounter {
        fn state(&mut self) -> crate::error::Result<Array1<f32>> {
            Ok(Array1::zeros(1))
        }

        fn apply(&mut self, action: usize) -> crate::error::Result<()> {
            if !self.applied.contains(&action) {
                self.applied.push(action);
            }
            Ok(())
        }

        fn measure_terminal_reward(&mut self) -> crate::error::Result<f32> {
            if self.applied.contains(&3) {
                return Err(FlagforgeError::EnvironmentFailure("crashed".into()));
            }
            Ok(self.applied.iter().filter(|&&a| a % 2 == 0).count() as f32)
        }

        fn reset(&mut self, program: Option<&str>) -> crate::error::Result<()> {
            self.applied.clear();
            self.resets.push(program.map(str::to_string));
            Ok(())
        }
    }

    fn env() -> EvenCounter {
        EvenCounter { applied: Vec::new(), resets: Vec::new() }
    }

    #[test]
    fn test_random_search_keeps_best() {
        let mut env = env();
        let mut rng = StdRng::seed_from_u64(11);
        let result = random_search(&mut env, Some("qsort"), 6, 200, &mut rng).unwrap();

        assert_eq!(result.evaluations + result.failures, 200);
        let best = result.best_reward.unwrap();
        let evens = result.best_actions.iter().filter(|&&a| a % 2 == 0).count() as f32;
        assert_eq!(best, evens);
        assert!(!result.best_actions.contains(&3));
        // 200 draws of up to 5 actions from 6 reach all three even ones.
        assert_eq!(best, 3.0);

        assert_eq!(env.resets[0].as_deref(), Some("qsort"));
        assert!(env.resets[1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_sweep_measures_every_prefix() {
        let mut env = env();
        let rewards = iterative_sweep(&mut env, None, &[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(rewards, vec![Some(1.0), Some(1.0), Some(2.0), None, None]);
    }

    #[test]
    fn test_zero_actions_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(random_search(&mut env(), None, 0, 10, &mut rng).is_err());
    }
}
