use thiserror::Error;

use crate::types::Coordinate;

/// Errors raised by the steering core and its configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("total error requested before any sample was processed")]
    DivisionByZero,

    #[error("gain {coordinate} must be finite, got {value}")]
    InvalidGain { coordinate: Coordinate, value: f64 },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Result type for steering core operations
pub type ControlResult<T> = Result<T, ControlError>;
