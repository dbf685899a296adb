//! Client configuration.

use std::time::Duration;

use lootsync_core::{ConfigError, DismantleRules};

/// Request gating and local dismantle prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientConfig {
    /// How long a request stays pending without an answer.
    pub pending_ttl: Duration,
    /// How long a drop is held off after a pickup attempt resolves.
    pub pickup_cooldown: Duration,
    /// Strength sent with every dismantle tap.
    pub tap_strength: f32,
    /// Dismantle timing, matching the host's.
    pub dismantle: DismantleRules,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::from_secs(1),
            pickup_cooldown: Duration::from_secs(2),
            tap_strength: 0.25,
            dismantle: DismantleRules::default(),
        }
    }
}

impl ClientConfig {
    /// Check every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pending_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "pending_ttl" });
        }
        let strength_ok = self.tap_strength > 0.0 && self.tap_strength <= 1.0;
        if !strength_ok {
            return Err(ConfigError::OutOfRange {
                field: "tap_strength",
                range: "(0, 1]",
                value: self.tap_strength,
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
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = ClientConfig { pending_ttl: Duration::ZERO, ..ClientConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration { field: "pending_ttl" }));
    }

    #[test]
    fn zero_cooldown_is_allowed() {
        let config = ClientConfig { pickup_cooldown: Duration::ZERO, ..ClientConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tap_strength_must_be_a_fraction() {
        for bad in [0.0, 1.01, f32::INFINITY, f32::NAN] {
            let config = ClientConfig { tap_strength: bad, ..ClientConfig::default() };
            assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
        }
    }
}
