//! Property-based tests for the dismantle accumulator.

use std::time::Duration;

use lootsync_core::{DismantleAccumulator, DismantleRules, TapOutcome};
use proptest::prelude::*;

/// Gaps between taps in milliseconds, spanning too-soon, normal and decayed.
fn tap_schedule() -> impl Strategy<Value = Vec<(u64, f32)>> {
    prop::collection::vec((0u64..1500, 0.0f32..=1.0), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_progress_stays_in_unit_interval(schedule in tap_schedule()) {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();
        let mut now = Duration::ZERO;

        for (gap, strength) in schedule {
            now += Duration::from_millis(gap);
            acc.tap(strength, now, &rules);
            acc.decay(now, &rules);

            // PROPERTY: progress is always a valid fraction
            prop_assert!((0.0..=1.0).contains(&acc.progress()));
        }
    }

    #[test]
    fn prop_completes_at_most_once(schedule in tap_schedule()) {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();
        let mut now = Duration::ZERO;
        let mut completions = 0;

        for (gap, strength) in schedule {
            now += Duration::from_millis(gap);
            if acc.tap(strength, now, &rules) == TapOutcome::Completed {
                completions += 1;
            }
        }

        // PROPERTY: completion is reported exactly once, and only when full
        prop_assert!(completions <= 1);
        prop_assert_eq!(completions == 1, acc.is_complete());
    }

    #[test]
    fn prop_progress_monotonic_within_window(
        gaps in prop::collection::vec(75u64..1000, 1..20),
        strength in 0.01f32..0.5,
    ) {
        let rules = DismantleRules::default();
        let mut acc = DismantleAccumulator::new();
        let mut now = Duration::ZERO;
        let mut previous = 0.0;

        for gap in gaps {
            now += Duration::from_millis(gap);
            acc.tap(strength, now, &rules);

            // PROPERTY: without a decay gap, progress never goes down
            prop_assert!(acc.progress() >= previous);
            previous = acc.progress();
        }
    }
}
