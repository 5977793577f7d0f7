use ndarray::Array2;
use serde::{Serialize, Deserialize};

use crate::error::{FlagforgeError, Result};

/// Error signals used as the output-layer gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Loss {
    /// `output - target`
    Difference,

    /// `(output - target)^2`
    Squared,

    /// `(clamp(output - target, -clip, clip))^2`
    ClippedSquared { clip: f32 },

    /// `output - target` inside `delta`, `delta * sign(output - target)` outside
    Huber { delta: f32 },
}

impl Default for Loss {
    fn default() -> Self {
        Loss::Huber { delta: 1.0 }
    }
}

impl Loss {
    /// Compute the gradient matrix for `output` against `target`.
    pub fn gradient(&self, output: &Array2<f32>, target: &Array2<f32>) -> Result<Array2<f32>> {
        if output.dim() != target.dim() {
            return Err(FlagforgeError::dimension_mismatch(
                format!("target shape {:?}", output.dim()),
                format!("{:?}", target.dim()),
            ));
        }

        let diff = output - target;
        let gradient = match *self {
            Loss::Difference => diff,
            Loss::Squared => diff.mapv(|d| d * d),
            Loss::ClippedSquared { clip } => diff.mapv(|d| {
                let c = d.clamp(-clip, clip);
                c * c
            }),
            Loss::Huber { delta } => diff.mapv(|d| {
                if d.abs() <= delta {
                    d
                } else {
                    delta * d.signum()
                }
            }),
        };
        Ok(gradient)
    }

    /// Scalar loss for monitoring; mean over all elements.
    pub fn value(&self, output: &Array2<f32>, target: &Array2<f32>) -> Result<f32> {
        if output.dim() != target.dim() {
            return Err(FlagforgeError::dimension_mismatch(
                format!("target shape {:?}", output.dim()),
                format!("{:?}", target.dim()),
            ));
        }

        let diff = output - target;
        let total: f32 = match *self {
            Loss::Huber { delta } => diff
                .iter()
                .map(|&d| {
                    let a = d.abs();
                    if a <= delta {
                        0.5 * d * d
                    } else {
                        delta * a - 0.5 * delta * delta
                    }
                })
                .sum(),
            Loss::ClippedSquared { clip } => diff
                .iter()
                .map(|&d| {
                    let c = d.clamp(-clip, clip);
                    c * c
                })
                .sum(),
            Loss::Difference | Loss::Squared => diff.iter().map(|&d| d * d).sum(),
        };
        Ok(total / diff.len().max(1) as f32)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            Loss::ClippedSquared { clip } if !(clip > 0.0) => Err(FlagforgeError::invalid_parameter(
                "loss.clip",
                "clip bound must be positive",
            )),
            Loss::Huber { delta } if !(delta > 0.0) => Err(FlagforgeError::invalid_parameter(
                "loss.delta",
                "Huber delta must be positive",
            )),
            _ => Ok(()),
        }
    }
}
