use thiserror::Error;

use crate::core::hardware::StepDirection;

/// Construction-time validation failures. Fatal at startup, never recovered.
#[derive(Error, PartialEq, Clone, Copy, Debug)]
pub enum ConfigError {
    #[error("lookup table is empty")]
    EmptyTable,

    #[error("lookup table axes differ in length ({speeds} wind speeds, {angles} angles)")]
    MismatchedTableLengths { speeds: usize, angles: usize },

    #[error("lookup table wind speed axis must be strictly increasing")]
    NonMonotonicWindSpeeds,

    #[error("lookup table contains a non-finite entry")]
    NonFiniteTableEntry,

    #[error("output limits are inverted ({lower} >= {upper})")]
    InvalidOutputLimits { lower: f64, upper: f64 },

    #[error("deadzone must be non-negative, got {0}")]
    NegativeDeadzone(f64),

    #[error("activation wind band is inverted ({low} >= {high})")]
    InvalidActivationBand { low: f64, high: f64 },

    #[error("move timeout must be positive, got {0}")]
    InvalidMoveTimeout(f64),
}

/// Runtime faults that force the actuator off. Latched by the state machine
/// until explicitly cleared.
#[derive(Error, PartialEq, Clone, Copy, Debug)]
pub enum FinFault {
    #[error("move toward {direction:?} limit exceeded {elapsed:.1}s without switch confirmation")]
    MoveTimeout {
        direction: StepDirection,
        elapsed: f64,
    },

    #[error("both limit switches pressed at once")]
    ContradictorySwitches,
}
