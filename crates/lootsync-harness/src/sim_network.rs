//! Seeded, fault-injecting chat channel.
//!
//! Models the shared chat line the protocol rides on: every published line
//! goes to every endpoint, the publisher included. Delivery is at-least-once.
//! Depending on [`Faults`], lines may be duplicated, delivered out of order,
//! or interleaved with unrelated chat and corrupted protocol lines. Nothing is
//! ever lost.
//!
//! All randomness comes from one seed, so a failing run replays exactly.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

/// Endpoint index. The host is endpoint 0.
pub type Endpoint = usize;

/// Lines that are not protocol traffic, or are protocol traffic gone wrong.
const NOISE: &[&str] = &[
    "gg",
    "anyone selling health potions?",
    "<size=0></size>",
    "<size=0>[SYNC]PROGRESS|1|x|0.5</size>",
    "<size=0>[SYNC]CREATED|1|0</size>",
    "[REQ]PICKUP|abc|1",
    "[REQ]TAP|1|1|NaN",
    "[REQ]LOOT|1|1",
    "[SYNC]SHARED|1|1",
];

/// Fault injection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Faults {
    /// Chance (0..=100) each copy of a line is delivered twice.
    pub duplicate_percent: u8,
    /// Deliver each endpoint's queue in random order instead of FIFO.
    pub reorder: bool,
    /// Chance (0..=100) a noise line is injected alongside a publish.
    pub noise_percent: u8,
}

impl Faults {
    /// Reliable in-order delivery.
    pub const NONE: Self = Self { duplicate_percent: 0, reorder: false, noise_percent: 0 };

    /// Every fault enabled.
    pub const CHAOS: Self = Self { duplicate_percent: 30, reorder: true, noise_percent: 20 };
}

impl Default for Faults {
    fn default() -> Self {
        Self::NONE
    }
}

/// Simulated broadcast channel.
#[derive(Debug)]
pub struct SimNetwork {
    rng: ChaCha8Rng,
    faults: Faults,
    inboxes: Vec<VecDeque<String>>,
    published: usize,
    delivered: usize,
}

impl SimNetwork {
    /// Channel with `endpoints` participants.
    pub fn new(seed: u64, endpoints: usize, faults: Faults) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            faults,
            inboxes: vec![VecDeque::new(); endpoints],
            published: 0,
            delivered: 0,
        }
    }

    /// Publish a line to every endpoint.
    pub fn publish(&mut self, line: &str) {
        self.published += 1;
        for inbox in 0..self.inboxes.len() {
            self.enqueue(inbox, line);
            if self.roll(self.faults.duplicate_percent) {
                self.enqueue(inbox, line);
            }
        }

        if self.roll(self.faults.noise_percent)
            && let Some(noise) = NOISE.choose(&mut self.rng)
        {
            for inbox in 0..self.inboxes.len() {
                self.enqueue(inbox, noise);
            }
        }
    }

    /// Take the next line to deliver, or `None` if nothing is in flight.
    pub fn next_delivery(&mut self) -> Option<(Endpoint, String)> {
        let busy: Vec<Endpoint> =
            (0..self.inboxes.len()).filter(|&i| !self.inboxes[i].is_empty()).collect();
        let &endpoint = busy.choose(&mut self.rng)?;

        let inbox = &mut self.inboxes[endpoint];
        let line = if self.faults.reorder {
            let at = self.rng.gen_range(0..inbox.len());
            inbox.remove(at)
        } else {
            inbox.pop_front()
        }?;

        self.delivered += 1;
        Some((endpoint, line))
    }

    /// Lines queued for delivery across all endpoints.
    pub fn in_flight(&self) -> usize {
        self.inboxes.iter().map(VecDeque::len).sum()
    }

    /// Whether nothing is left to deliver.
    pub fn is_idle(&self) -> bool {
        self.inboxes.iter().all(VecDeque::is_empty)
    }

    /// Lines published so far.
    pub fn published(&self) -> usize {
        self.published
    }

    /// Lines delivered so far, noise and duplicates included.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    fn enqueue(&mut self, endpoint: Endpoint, line: &str) {
        self.inboxes[endpoint].push_back(line.to_string());
    }

    fn roll(&mut self, percent: u8) -> bool {
        percent > 0 && self.rng.gen_range(0..100u8) < percent
    }
}
