use std::fmt;

/// Result type for flagforge operations
pub type Result<T> = std::result::Result<T, FlagforgeError>;

/// Main error type for the flagforge library
#[derive(Debug, Clone, PartialEq)]
pub enum FlagforgeError {
    /// Invalid dimensions for operations (input width, stored weight shape, target shape)
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action index outside the network's output width
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Sampling from a buffer nothing has been stored in
    EmptyBuffer(String),

    /// Compilation, execution or measurement failed in the environment
    EnvironmentFailure(String),

    /// An environment call did not answer in time
    Timeout(String),

    /// IO errors (file operations)
    Io(String),

    /// Malformed text in a weight file
    Parse(String),

    /// Serialization/deserialization errors
    Serialization(String),

    /// Numerical computation errors
    NumericalError(String),
}

impl fmt::Display for FlagforgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagforgeError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            FlagforgeError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            FlagforgeError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            FlagforgeError::EmptyBuffer(msg) => write!(f, "Empty buffer: {}", msg),
            FlagforgeError::EnvironmentFailure(msg) => write!(f, "Environment failure: {}", msg),
            FlagforgeError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            FlagforgeError::Io(msg) => write!(f, "IO error: {}", msg),
            FlagforgeError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FlagforgeError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            FlagforgeError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for FlagforgeError {}

impl From<std::io::Error> for FlagforgeError {
    fn from(err: std::io::Error) -> Self {
        FlagforgeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FlagforgeError {
    fn from(err: serde_json::Error) -> Self {
        FlagforgeError::Serialization(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for FlagforgeError {
    fn from(err: std::num::ParseFloatError) -> Self {
        FlagforgeError::Parse(err.to_string())
    }
}

impl From<std::num::ParseIntError> for FlagforgeError {
    fn from(err: std::num::ParseIntError) -> Self {
        FlagforgeError::Parse(err.to_string())
    }
}

// Helper functions for common error patterns
impl FlagforgeError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        FlagforgeError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        FlagforgeError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether a training loop may skip the offending step and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FlagforgeError::EnvironmentFailure(_)
                | FlagforgeError::Timeout(_)
                | FlagforgeError::DimensionMismatch { .. }
        )
    }
}
