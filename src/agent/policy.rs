use ndarray::ArrayView1;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{FlagforgeError, Result};

/// Exploration rate as a function of the episode index.
///
/// ```rust
/// use flagforge::agent::EpsilonSchedule;
///
/// let schedule = EpsilonSchedule::LinearDecay { start: 1.0, end: 0.1, decay_episodes: 10 };
/// assert_eq!(schedule.value(0), 1.0);
/// assert!((schedule.value(5) - 0.55).abs() < 1e-6);
/// assert_eq!(schedule.value(50), 0.1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    /// Same rate for every episode
    Constant { epsilon: f32 },

    /// Straight line from `start` to `end` over `decay_episodes`, then `end`
    LinearDecay {
        start: f32,
        end: f32,
        decay_episodes: usize,
    },

    /// `end + (start - end) * rate^episode`
    ExponentialDecay { start: f32, end: f32, rate: f32 },
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule::Constant { epsilon: 0.3 }
    }
}

impl EpsilonSchedule {
    /// Exploration rate for `episode`, always within `[0, 1]`.
    pub fn value(&self, episode: usize) -> f32 {
        let epsilon = match self {
            EpsilonSchedule::Constant { epsilon } => *epsilon,

            EpsilonSchedule::LinearDecay { start, end, decay_episodes } => {
                if episode >= *decay_episodes {
                    *end
                } else {
                    let progress = episode as f32 / *decay_episodes as f32;
                    start + (end - start) * progress
                }
            }

            EpsilonSchedule::ExponentialDecay { start, end, rate } => {
                end + (start - end) * rate.powf(episode as f32)
            }
        };

        if epsilon.is_nan() {
            0.0
        } else {
            epsilon.clamp(0.0, 1.0)
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let in_range = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(FlagforgeError::invalid_parameter(
                    format!("epsilon.{}", name),
                    "Must be between 0 and 1".to_string(),
                ))
            }
        };

        match self {
            EpsilonSchedule::Constant { epsilon } => in_range("epsilon", *epsilon),
            EpsilonSchedule::LinearDecay { start, end, .. } => {
                in_range("start", *start)?;
                in_range("end", *end)
            }
            EpsilonSchedule::ExponentialDecay { start, end, rate } => {
                in_range("start", *start)?;
                in_range("end", *end)?;
                in_range("rate", *rate)
            }
        }
    }
}

/// Whether this step explores. Draws exactly one number from `rng`.
pub fn explores<R: Rng + ?Sized>(epsilon: f32, rng: &mut R) -> bool {
    rng.gen::<f32>() < epsilon
}

/// Uniformly random action among those marked legal.
pub fn random_legal_action<R: Rng + ?Sized>(legal: &[bool], rng: &mut R) -> Result<usize> {
    let candidates: Vec<usize> = legal
        .iter()
        .enumerate()
        .filter(|&(_, &ok)| ok)
        .map(|(i, _)| i)
        .collect();

    if candidates.is_empty() {
        return Err(no_legal_action());
    }
    Ok(candidates[rng.gen_range(0..candidates.len())])
}

/// Highest-valued legal action. Ties go to the lowest index and NaN never wins
/// against a number.
pub fn greedy_legal_action(q_values: ArrayView1<f32>, legal: &[bool]) -> Result<usize> {
    if q_values.len() != legal.len() {
        return Err(FlagforgeError::dimension_mismatch(
            format!("{} Q-values", legal.len()),
            format!("{} Q-values", q_values.len()),
        ));
    }

    let mut best: Option<(usize, f32)> = None;
    for (action, (&q, &ok)) in q_values.iter().zip(legal.iter()).enumerate() {
        if !ok {
            continue;
        }
        match best {
            None => best = Some((action, q)),
            Some((_, best_q)) if q > best_q || (best_q.is_nan() && !q.is_nan()) => {
                best = Some((action, q))
            }
            _ => {}
        }
    }

    best.map(|(action, _)| action).ok_or_else(no_legal_action)
}

fn no_legal_action() -> FlagforgeError {
    FlagforgeError::invalid_parameter("legal_actions", "No action is legal in this state")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_schedules_stay_in_unit_interval() {
        let schedules = [
            EpsilonSchedule::Constant { epsilon: 1.5 },
            EpsilonSchedule::LinearDecay { start: 1.0, end: -0.5, decay_episodes: 4 },
            EpsilonSchedule::ExponentialDecay { start: 1.0, end: 0.05, rate: 0.9 },
        ];
        for schedule in &schedules {
            for episode in 0..200 {
                let epsilon = schedule.value(episode);
                assert!((0.0..=1.0).contains(&epsilon), "{:?} at {} gave {}", schedule, episode, epsilon);
            }
        }
    }

    #[test]
    fn test_exponential_decay_approaches_end() {
        let schedule = EpsilonSchedule::ExponentialDecay { start: 1.0, end: 0.05, rate: 0.5 };
        assert_eq!(schedule.value(0), 1.0);
        assert!(schedule.value(1) < schedule.value(0));
        assert!((schedule.value(60) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(EpsilonSchedule::Constant { epsilon: 0.3 }.validate().is_ok());
        assert!(EpsilonSchedule::Constant { epsilon: -0.1 }.validate().is_err());
        assert!(EpsilonSchedule::ExponentialDecay { start: 1.0, end: 0.0, rate: 2.0 }.validate().is_err());
    }

    #[test]
    fn test_greedy_ties_go_to_lowest_index() {
        let q = array![0.5, 2.0, 2.0, 1.0];
        assert_eq!(greedy_legal_action(q.view(), &[true; 4]).unwrap(), 1);
    }

    #[test]
    fn test_greedy_respects_legality() {
        let q = array![0.5, 2.0, 1.5, 1.0];
        assert_eq!(greedy_legal_action(q.view(), &[true, false, true, true]).unwrap(), 2);
        assert!(greedy_legal_action(q.view(), &[false; 4]).is_err());
    }

    #[test]
    fn test_greedy_skips_nan() {
        let q = array![f32::NAN, -3.0];
        assert_eq!(greedy_legal_action(q.view(), &[true, true]).unwrap(), 1);
    }

    #[test]
    fn test_random_never_picks_illegal() {
        let mut rng = StdRng::seed_from_u64(3);
        let legal = [true, false, true, false];
        for _ in 0..500 {
            let action = random_legal_action(&legal, &mut rng).unwrap();
            assert!(legal[action]);
        }
    }
}
