//! Host configuration.

use std::time::Duration;

use lootsync_core::{ConfigError, DismantleRules};

/// Timing and limits applied by the request router.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostConfig {
    /// Minimum drop age before it can be picked up.
    pub pickup_delay: Duration,
    /// Tap strengths above this are clamped down to it.
    pub max_tap_strength: f32,
    /// Dismantle timing.
    pub dismantle: DismantleRules,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            pickup_delay: Duration::from_millis(500),
            max_tap_strength: 1.0,
            dismantle: DismantleRules::default(),
        }
    }
}

impl HostConfig {
    /// Check every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strength_ok = self.max_tap_strength > 0.0 && self.max_tap_strength <= 1.0;
        if !strength_ok {
            return Err(ConfigError::OutOfRange {
                field: "max_tap_strength",
                range: "(0, 1]",
                value: self.max_tap_strength,
            });
        }
        self.dismantle.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(HostConfig::default().validate().is_ok());
    }

    #[test]
    fn tap_strength_must_be_a_fraction() {
        for bad in [0.0, -1.0, 1.5, f32::NAN] {
            let config = HostConfig { max_tap_strength: bad, ..HostConfig::default() };
            assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
        }
    }
}
