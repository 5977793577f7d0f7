use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand_distr::{Normal, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{FlagforgeError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform: `U(-sqrt(6 / (fan_in + fan_out)), +sqrt(6 / (fan_in + fan_out)))`
    XavierUniform,

    /// He/Kaiming normal: `N(0, sqrt(2 / fan_in))`
    HeNormal,

    /// Uniform distribution with custom range
    Uniform { min: f32, max: f32 },

    /// All zeros
    Zeros,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::XavierUniform
    }
}

impl WeightInit {
    /// Draw a `shape` weight matrix for a layer with the given fan-in and fan-out.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Array2<f32>> {
        match *self {
            WeightInit::XavierUniform => {
                if fan_in + fan_out == 0 {
                    return Err(FlagforgeError::invalid_parameter(
                        "fan_in + fan_out",
                        "must be positive for Xavier initialization",
                    ));
                }
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Ok(Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng))
            }

            WeightInit::HeNormal => {
                if fan_in == 0 {
                    return Err(FlagforgeError::invalid_parameter(
                        "fan_in",
                        "must be positive for He initialization",
                    ));
                }
                let std = (2.0 / fan_in as f32).sqrt();
                let normal = Normal::new(0.0, std)
                    .map_err(|e| FlagforgeError::invalid_parameter("std".to_string(), e.to_string()))?;
                Ok(Array2::random_using(shape, normal, rng))
            }

            WeightInit::Uniform { min, max } => {
                if !(min < max) {
                    return Err(FlagforgeError::invalid_parameter(
                        "uniform range",
                        "min must be strictly less than max",
                    ));
                }
                Ok(Array2::random_using(shape, Uniform::new(min, max), rng))
            }

            WeightInit::Zeros => Ok(Array2::zeros(shape)),
        }
    }
}
