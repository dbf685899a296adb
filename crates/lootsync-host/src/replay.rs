//! Replay protection for player `DROP` requests.
//!
//! A `DROP` is keyed by `(requester, session, seq)`. Each requester gets a
//! fixed-size sliding window over `seq` for its current session, and a short
//! list of sessions it has moved on from. Memory per requester is constant no
//! matter how many drops it sends, and none of it is cleared by cleanup: a
//! redelivered line from before a cleanup is still a replay.

use std::collections::{HashMap, VecDeque};

use lootsync_proto::PlayerId;

use crate::error::Rejection;

/// Sequence numbers tracked behind the highest one seen.
pub const DROP_WINDOW: u64 = 64;

/// Previous sessions remembered per requester.
pub const MAX_RETIRED_SESSIONS: usize = 8;

#[derive(Debug, Clone)]
struct RequesterWindow {
    session: u64,
    /// Highest `seq` applied in `session`, 0 before the first.
    highest: u64,
    /// Bit `i` set when `highest - i` was applied.
    seen: u64,
    retired: VecDeque<u64>,
}

impl RequesterWindow {
    fn new(session: u64) -> Self {
        Self { session, highest: 0, seen: 0, retired: VecDeque::new() }
    }

    fn admit(&mut self, requester: PlayerId, session: u64, seq: u64) -> Result<(), Rejection> {
        if session != self.session {
            if self.retired.contains(&session) {
                return Err(Rejection::StaleDrop { requester, seq });
            }
            if self.retired.len() == MAX_RETIRED_SESSIONS {
                self.retired.pop_front();
            }
            self.retired.push_back(self.session);
            self.session = session;
            self.highest = 0;
            self.seen = 0;
        }

        if seq > self.highest {
            let shift = seq - self.highest;
            self.seen = if shift >= DROP_WINDOW { 0 } else { self.seen << shift };
            self.seen |= 1;
            self.highest = seq;
            return Ok(());
        }

        let offset = self.highest - seq;
        if offset >= DROP_WINDOW {
            return Err(Rejection::StaleDrop { requester, seq });
        }
        let bit = 1u64 << offset;
        if self.seen & bit != 0 {
            return Err(Rejection::DuplicateDrop { requester, seq });
        }
        self.seen |= bit;
        Ok(())
    }
}

/// Per-requester `DROP` replay windows.
#[derive(Debug, Clone, Default)]
pub struct DropReplayGuard {
    windows: HashMap<PlayerId, RequesterWindow>,
}

impl DropReplayGuard {
    /// Empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(requester, session, seq)`, or refuse it as a replay.
    ///
    /// A session other than the requester's current one becomes current and
    /// the old one is retired; lines from retired sessions are refused.
    pub fn admit(&mut self, requester: PlayerId, session: u64, seq: u64) -> Result<(), Rejection> {
        self.windows
            .entry(requester)
            .or_insert_with(|| RequesterWindow::new(session))
            .admit(requester, session, seq)
    }

    /// Number of requesters tracked.
    pub fn requesters(&self) -> usize {
        self.windows.len()
    }

    /// Sessions remembered for `requester`, current one included.
    pub fn sessions(&self, requester: PlayerId) -> usize {
        self.windows.get(&requester).map_or(0, |w| w.retired.len() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_window_reordering_is_accepted_once() {
        let mut guard = DropReplayGuard::new();
        for seq in [3, 1, 2] {
            assert_eq!(guard.admit(7, 100, seq), Ok(()));
        }
        for seq in [1, 2, 3] {
            let replay = guard.admit(7, 100, seq);
            assert_eq!(replay, Err(Rejection::DuplicateDrop { requester: 7, seq }));
        }
    }

    #[test]
    fn sequence_numbers_behind_the_window_are_stale() {
        let mut guard = DropReplayGuard::new();
        assert_eq!(guard.admit(7, 100, 1), Ok(()));
        assert_eq!(guard.admit(7, 100, 1 + DROP_WINDOW), Ok(()));
        assert_eq!(guard.admit(7, 100, 1), Err(Rejection::StaleDrop { requester: 7, seq: 1 }));
    }

    #[test]
    fn new_session_starts_fresh_and_retires_the_old_one() {
        let mut guard = DropReplayGuard::new();
        assert_eq!(guard.admit(7, 100, 1), Ok(()));
        assert_eq!(guard.admit(7, 200, 1), Ok(()));
        assert_eq!(guard.admit(7, 100, 2), Err(Rejection::StaleDrop { requester: 7, seq: 2 }));
        assert_eq!(guard.sessions(7), 2);
    }

    #[test]
    fn state_stays_bounded() {
        let mut guard = DropReplayGuard::new();
        for session in 0..100 {
            for seq in 1..=500 {
                assert_eq!(guard.admit(7, session, seq), Ok(()));
            }
        }
        assert_eq!(guard.requesters(), 1);
        assert_eq!(guard.sessions(7), MAX_RETIRED_SESSIONS + 1);
    }
}
