//! Configuration errors.

use std::time::Duration;

use thiserror::Error;

/// A timing or limit setting that cannot work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Duration that must be positive is zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Offending setting.
        field: &'static str,
    },

    /// Two durations are in the wrong order.
    #[error("{shorter} ({shorter_value:?}) must be less than {longer} ({longer_value:?})")]
    Ordering {
        /// Setting that must be smaller.
        shorter: &'static str,
        /// Its value.
        shorter_value: Duration,
        /// Setting that must be larger.
        longer: &'static str,
        /// Its value.
        longer_value: Duration,
    },

    /// Numeric setting outside its allowed range.
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        /// Offending setting.
        field: &'static str,
        /// Human-readable range.
        range: &'static str,
        /// Actual value.
        value: f32,
    },
}
