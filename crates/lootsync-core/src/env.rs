//! Environment abstraction for deterministic testing.
//!
//! Every timing rule in the protocol (pickup delay, tap interval, decay,
//! pending expiry, cooldowns) reads time through [`Environment`], and client
//! session nonces read randomness through it, so the same logic runs against
//! the system clock and OS RNG in production and a virtual clock with a
//! seeded RNG in simulation.

use std::time::Duration;

/// Source of monotonic time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards within one environment instance.
/// - Given the same seed, a simulated environment produces the same random
///   bytes.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type produced by this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant advanced explicitly by the test.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`, used for client session nonces.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Elapsed time from `earlier` to `later`, zero if the clock is out of order.
pub fn elapsed<I>(earlier: I, later: I) -> Duration
where
    I: Copy + Ord + std::ops::Sub<Output = Duration>,
{
    if later >= earlier { later - earlier } else { Duration::ZERO }
}
