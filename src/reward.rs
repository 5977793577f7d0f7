//! Episode reward from measured runtimes.

use serde::{Serialize, Deserialize};

use crate::error::{FlagforgeError, Result};

/// How a runtime change is turned into a reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RewardMode {
    /// Relative speed-up, zero when the program got slower or did not change.
    #[default]
    ClippedImprovement,

    /// Relative change with sign: positive when faster, negative when slower.
    SignedImprovement,
}

/// Relative improvement of `runtime` over `baseline`, normalized by their mean.
///
/// `|baseline - runtime| / ((baseline + runtime) / 2)` is bounded by 2, which
/// keeps rewards comparable across programs with very different runtimes.
/// Non-positive or non-finite runtimes are measurement failures, never rewards.
pub fn relative_improvement(baseline: f64, runtime: f64, mode: RewardMode) -> Result<f32> {
    for (name, value) in [("baseline", baseline), ("runtime", runtime)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(FlagforgeError::EnvironmentFailure(format!(
                "invalid {} measurement: {}",
                name, value
            )));
        }
    }

    let mean = (baseline + runtime) / 2.0;
    let change = (baseline - runtime) / mean;
    let reward = match mode {
        RewardMode::ClippedImprovement => change.max(0.0),
        RewardMode::SignedImprovement => change,
    };
    Ok(reward as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faster_runtime_is_rewarded() {
        let reward = relative_improvement(3.0, 1.0, RewardMode::ClippedImprovement).unwrap();
        assert!((reward - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_slower_runtime_clipped_to_zero() {
        assert_eq!(relative_improvement(1.0, 3.0, RewardMode::ClippedImprovement).unwrap(), 0.0);
        assert_eq!(relative_improvement(2.0, 2.0, RewardMode::ClippedImprovement).unwrap(), 0.0);
    }

    #[test]
    fn test_signed_mode_is_antisymmetric() {
        let faster = relative_improvement(3.0, 1.0, RewardMode::SignedImprovement).unwrap();
        let slower = relative_improvement(1.0, 3.0, RewardMode::SignedImprovement).unwrap();
        assert!((faster + slower).abs() < 1e-6);
        assert!(slower < 0.0);
    }

    #[test]
    fn test_bounded() {
        let reward = relative_improvement(1e9, 1e-9, RewardMode::ClippedImprovement).unwrap();
        assert!(reward <= 2.0);
    }

    #[test]
    fn test_failed_measurement_rejected() {
        // A runtime of -1 is what a failed run used to report.
        assert!(relative_improvement(1.0, -1.0, RewardMode::ClippedImprovement).is_err());
        assert!(relative_improvement(f64::NAN, 1.0, RewardMode::SignedImprovement).is_err());
        assert!(relative_improvement(0.0, 1.0, RewardMode::SignedImprovement).is_err());
    }
}
