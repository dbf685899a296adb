//! Client-side request deduplication.
//!
//! Several independent triggers (a key press, an auto-pickup scan, a UI
//! button) may ask for the same drop within a few frames. The tracker lets
//! exactly one request through per drop and operation until the host answers
//! or the request expires. Pickups additionally get a cooldown after they
//! resolve, so a periodic scanner doesn't immediately retry a drop it just
//! failed to claim.
//!
//! Nothing here talks to the network; a suppressed request is simply never
//! sent.

use std::{collections::HashMap, ops::Sub, time::Duration};

use lootsync_core::env::elapsed;
use lootsync_proto::DropId;

/// Operations the tracker deduplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PendingKind {
    /// Pickup request.
    Pickup,
    /// Share request.
    Share,
    /// Instant dismantle request.
    InstantDismantle,
}

/// Whether a request may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Send it; it is now pending.
    Admitted,
    /// Same operation on the same drop is still in flight.
    AlreadyPending,
    /// The drop was attempted recently.
    CoolingDown {
        /// Time until the cooldown ends.
        remaining: Duration,
    },
}

/// Per-client pending set and pickup cooldowns.
#[derive(Debug, Clone)]
pub struct PendingOperationTracker<I> {
    pending: HashMap<(PendingKind, DropId), I>,
    cooldowns: HashMap<DropId, I>,
    pending_ttl: Duration,
    cooldown: Duration,
}

impl<I> PendingOperationTracker<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Tracker expiring requests after `pending_ttl` and holding pickups off
    /// for `cooldown` once they resolve.
    pub fn new(pending_ttl: Duration, cooldown: Duration) -> Self {
        Self { pending: HashMap::new(), cooldowns: HashMap::new(), pending_ttl, cooldown }
    }

    /// Ask to send `kind` for `drop_id`. Records it as pending when admitted.
    pub fn try_begin(&mut self, kind: PendingKind, drop_id: DropId, now: I) -> Admission {
        if let Some(&started) = self.pending.get(&(kind, drop_id)) {
            if elapsed(started, now) < self.pending_ttl {
                return Admission::AlreadyPending;
            }
            self.finish(kind, drop_id, now);
        }

        if kind == PendingKind::Pickup
            && let Some(&since) = self.cooldowns.get(&drop_id)
        {
            let waited = elapsed(since, now);
            if waited < self.cooldown {
                return Admission::CoolingDown { remaining: self.cooldown - waited };
            }
            self.cooldowns.remove(&drop_id);
        }

        self.pending.insert((kind, drop_id), now);
        Admission::Admitted
    }

    /// The host answered `kind` on `drop_id`. Returns whether it was pending.
    pub fn resolve(&mut self, kind: PendingKind, drop_id: DropId, now: I) -> bool {
        if self.pending.contains_key(&(kind, drop_id)) {
            self.finish(kind, drop_id, now);
            true
        } else {
            false
        }
    }

    /// The drop is gone; resolve everything pending on it.
    pub fn resolve_all(&mut self, drop_id: DropId, now: I) -> usize {
        let kinds: Vec<PendingKind> = self
            .pending
            .keys()
            .filter(|(_, id)| *id == drop_id)
            .map(|(kind, _)| *kind)
            .collect();
        for &kind in &kinds {
            self.finish(kind, drop_id, now);
        }
        kinds.len()
    }

    /// Drop requests the host never answered and forget finished cooldowns.
    ///
    /// Returns the expired requests, sorted.
    pub fn expire(&mut self, now: I) -> Vec<(PendingKind, DropId)> {
        let ttl = self.pending_ttl;
        let mut expired: Vec<(PendingKind, DropId)> = self
            .pending
            .iter()
            .filter(|(_, started)| elapsed(**started, now) >= ttl)
            .map(|(key, _)| *key)
            .collect();
        expired.sort_unstable();

        for &(kind, drop_id) in &expired {
            self.finish(kind, drop_id, now);
        }

        let cooldown = self.cooldown;
        self.cooldowns.retain(|_, since| elapsed(*since, now) < cooldown);

        expired
    }

    /// Whether `kind` on `drop_id` is in flight.
    pub fn is_pending(&self, kind: PendingKind, drop_id: DropId) -> bool {
        self.pending.contains_key(&(kind, drop_id))
    }

    /// Whether pickups of `drop_id` are held off at `now`.
    pub fn is_cooling_down(&self, drop_id: DropId, now: I) -> bool {
        self.cooldowns.get(&drop_id).is_some_and(|since| elapsed(*since, now) < self.cooldown)
    }

    /// Number of requests in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.cooldowns.clear();
    }

    fn finish(&mut self, kind: PendingKind, drop_id: DropId, now: I) {
        self.pending.remove(&(kind, drop_id));
        if kind == PendingKind::Pickup {
            self.cooldowns.insert(drop_id, now);
        }
    }
}
