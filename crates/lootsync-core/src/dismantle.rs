//! Progressive dismantle state.
//!
//! A dismantle is a series of taps, each adding some progress. Taps arriving
//! faster than [`DismantleRules::min_tap_interval`] are ignored, and progress
//! left idle longer than [`DismantleRules::decay_after`] falls back to zero.
//! The host runs one accumulator per drop as the authority; clients run their
//! own for immediate visual feedback and overwrite it from host broadcasts.

use std::{ops::Sub, time::Duration};

use crate::{env::elapsed, error::ConfigError};

/// Timing rules shared by host and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismantleRules {
    /// Minimum spacing between accepted taps on one drop.
    pub min_tap_interval: Duration,
    /// Idle time after which accumulated progress resets.
    pub decay_after: Duration,
}

impl Default for DismantleRules {
    fn default() -> Self {
        Self { min_tap_interval: Duration::from_millis(75), decay_after: Duration::from_secs(1) }
    }
}

impl DismantleRules {
    /// Check the rules are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decay_after.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "decay_after" });
        }
        if self.min_tap_interval >= self.decay_after {
            return Err(ConfigError::Ordering {
                shorter: "min_tap_interval",
                shorter_value: self.min_tap_interval,
                longer: "decay_after",
                longer_value: self.decay_after,
            });
        }
        Ok(())
    }
}

/// Result of one tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Arrived within `min_tap_interval` of the previous tap. No change.
    TooSoon,
    /// Progress already reached 1. No change.
    AlreadyComplete,
    /// Progress increased but is still below 1.
    Advanced {
        /// New progress.
        progress: f32,
    },
    /// Progress reached 1.
    Completed,
}

/// Dismantle progress for one drop.
///
/// Generic over the instant type so it runs under both real and virtual
/// clocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DismantleAccumulator<I> {
    progress: f32,
    last_tap: Option<I>,
}

impl<I> Default for DismantleAccumulator<I> {
    fn default() -> Self {
        Self { progress: 0.0, last_tap: None }
    }
}

impl<I> DismantleAccumulator<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Fresh accumulator at zero progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Whether progress has reached 1.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// When the last accepted tap happened.
    pub fn last_tap(&self) -> Option<I> {
        self.last_tap
    }

    /// Apply one tap of `strength`.
    ///
    /// Non-positive strengths still count as a tap for rate limiting but add
    /// nothing. Progress clamps at 1.
    pub fn tap(&mut self, strength: f32, now: I, rules: &DismantleRules) -> TapOutcome {
        if self.is_complete() {
            return TapOutcome::AlreadyComplete;
        }

        if let Some(last) = self.last_tap {
            let idle = elapsed(last, now);
            if idle < rules.min_tap_interval {
                return TapOutcome::TooSoon;
            }
            if idle > rules.decay_after {
                self.progress = 0.0;
            }
        }

        self.last_tap = Some(now);
        self.progress = (self.progress + strength.max(0.0)).min(1.0);

        if self.is_complete() {
            TapOutcome::Completed
        } else {
            TapOutcome::Advanced { progress: self.progress }
        }
    }

    /// Reset progress if it has been idle longer than `decay_after`.
    ///
    /// Returns `true` if progress was reset.
    pub fn decay(&mut self, now: I, rules: &DismantleRules) -> bool {
        if self.progress <= 0.0 || self.is_complete() {
            return false;
        }
        match self.last_tap {
            Some(last) if elapsed(last, now) > rules.decay_after => {
                self.reset();
                true
            },
            _ => false,
        }
    }

    /// Jump straight to completion.
    pub fn complete(&mut self) {
        self.progress = 1.0;
    }

    /// Overwrite progress with an authoritative value.
    ///
    /// Out-of-range values are clamped. Tap timing is kept.
    pub fn sync(&mut self, progress: f32) {
        self.progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        if self.progress <= 0.0 {
            self.last_tap = None;
        }
    }

    /// Back to zero with no tap history.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.last_tap = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn three_taps_complete() {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();

        assert_eq!(acc.tap(0.4, ms(0), &rules), TapOutcome::Advanced { progress: 0.4 });
        assert_eq!(acc.tap(0.4, ms(100), &rules), TapOutcome::Advanced { progress: 0.8 });
        assert_eq!(acc.tap(0.4, ms(200), &rules), TapOutcome::Completed);
        assert_eq!(acc.progress(), 1.0);
    }

    #[test]
    fn tap_within_interval_is_ignored() {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();

        acc.tap(0.4, ms(0), &rules);
        assert_eq!(acc.tap(0.4, ms(50), &rules), TapOutcome::TooSoon);
        assert_eq!(acc.progress(), 0.4);

        // Interval measured from the last accepted tap.
        assert_eq!(acc.tap(0.4, ms(75), &rules), TapOutcome::Advanced { progress: 0.8 });
    }

    #[test]
    fn idle_progress_resets_before_next_tap() {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();

        acc.tap(0.4, ms(0), &rules);
        assert_eq!(acc.tap(0.4, ms(1500), &rules), TapOutcome::Advanced { progress: 0.4 });
    }

    #[test]
    fn decay_resets_only_after_window() {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();

        acc.tap(0.4, ms(0), &rules);
        assert!(!acc.decay(ms(1000), &rules));
        assert_eq!(acc.progress(), 0.4);

        assert!(acc.decay(ms(1500), &rules));
        assert_eq!(acc.progress(), 0.0);
        assert_eq!(acc.last_tap(), None);

        // Nothing left to decay.
        assert!(!acc.decay(ms(3000), &rules));
    }

    #[test]
    fn complete_accumulator_rejects_taps() {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::<Duration>::new();

        acc.complete();
        assert_eq!(acc.tap(0.1, ms(0), &rules), TapOutcome::AlreadyComplete);
        assert!(!acc.decay(ms(10_000), &rules));
    }

    #[test]
    fn sync_clamps() {
        let mut acc = DismantleAccumulator::<Duration>::new();
        acc.sync(1.7);
        assert_eq!(acc.progress(), 1.0);
        acc.sync(f32::NAN);
        assert_eq!(acc.progress(), 0.0);
    }

    #[test]
    fn rules_validate() {
        assert!(DismantleRules::default().validate().is_ok());

        let bad = DismantleRules { min_tap_interval: ms(2000), decay_after: ms(1000) };
        assert!(matches!(bad.validate(), Err(ConfigError::Ordering { .. })));

        let zero = DismantleRules { min_tap_interval: ms(0), decay_after: ms(0) };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroDuration { field: "decay_after" }));
    }
}
