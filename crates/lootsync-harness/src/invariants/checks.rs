//! Invariant implementations.

use std::collections::BTreeMap;

use lootsync_proto::{Broadcast, DropId};

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// A drop is granted at most once, and every grant was announced.
///
/// At most one terminal broadcast per drop, items granted equal `PICKEDUP`
/// broadcasts and currency granted equals the sum of `DISMANTLED` rewards.
pub struct AtMostOnceGrant;

impl Invariant for AtMostOnceGrant {
    fn name(&self) -> &'static str {
        "at_most_once_grant"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut terminals: BTreeMap<DropId, usize> = BTreeMap::new();
        let mut pickups = 0;
        let mut rewards = 0u64;

        for broadcast in &state.history {
            match broadcast {
                Broadcast::ItemPickedUp { .. } => pickups += 1,
                Broadcast::ItemDismantled { reward, .. } => rewards += reward,
                Broadcast::DropCreated(_)
                | Broadcast::ItemShared { .. }
                | Broadcast::DismantleProgress { .. } => continue,
            }
            *terminals.entry(broadcast.drop_id()).or_default() += 1;
        }

        if let Some((drop_id, count)) = terminals.iter().find(|(_, count)| **count > 1) {
            return Err(Violation {
                invariant: self.name(),
                message: format!("drop {drop_id} removed {count} times"),
            });
        }

        if pickups != state.items_granted {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} item(s) granted but {pickups} pickup(s) broadcast",
                    state.items_granted
                ),
            });
        }

        if rewards != state.currency_granted {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} currency granted but {rewards} announced",
                    state.currency_granted
                ),
            });
        }

        Ok(())
    }
}

/// Once the channel is quiet, every mirror equals the host registry.
pub struct MirrorConvergence;

impl Invariant for MirrorConvergence {
    fn name(&self) -> &'static str {
        "mirror_convergence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if !state.quiescent {
            return Ok(());
        }

        for client in &state.clients {
            if client.mirror != state.host_drops {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "player {} mirror {:?} differs from host {:?}",
                        client.player, client.mirror, state.host_drops
                    ),
                });
            }
        }

        Ok(())
    }
}

/// A removed drop never comes back, on the host or in any mirror.
pub struct TerminalNeverResurrected;

impl Invariant for TerminalNeverResurrected {
    fn name(&self) -> &'static str {
        "terminal_never_resurrected"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let removed = state.history.iter().filter(|b| b.is_terminal()).map(Broadcast::drop_id);
        for drop_id in removed {
            if state.host_drops.iter().any(|d| d.drop_id == drop_id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("host still holds removed drop {drop_id}"),
                });
            }
        }

        for client in &state.clients {
            if let Some(view) = client.mirror.iter().find(|d| client.removed.contains(&d.drop_id))
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "player {} mirrors drop {} after its removal",
                        client.player, view.drop_id
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Dismantle progress stays within `[0, 1]` everywhere.
pub struct ProgressInRange;

impl Invariant for ProgressInRange {
    fn name(&self) -> &'static str {
        "progress_in_range"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let views = state.host_drops.iter().chain(state.clients.iter().flat_map(|c| &c.mirror));
        for view in views {
            if !(0.0..=1.0).contains(&view.progress) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("drop {} has progress {}", view.drop_id, view.progress),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::invariants::{ClientSnapshot, DropView};

    fn view(drop_id: DropId, progress: f32) -> DropView {
        DropView { drop_id, revision: 0, owner: 1, shared: false, progress }
    }

    #[test]
    fn double_pickup_is_caught() {
        let state = SystemSnapshot {
            history: vec![
                Broadcast::ItemPickedUp { drop_id: 1, requester: 1 },
                Broadcast::ItemPickedUp { drop_id: 1, requester: 2 },
            ],
            items_granted: 2,
            ..SystemSnapshot::empty()
        };
        assert!(AtMostOnceGrant.check(&state).is_err());
    }

    #[test]
    fn unannounced_grant_is_caught() {
        let state = SystemSnapshot { currency_granted: 30, ..SystemSnapshot::empty() };
        assert!(AtMostOnceGrant.check(&state).is_err());
    }

    #[test]
    fn divergence_only_counts_when_quiet() {
        let client =
            ClientSnapshot { player: 1, mirror: vec![view(1, 0.5)], removed: BTreeSet::new() };
        let mut state = SystemSnapshot {
            quiescent: false,
            host_drops: vec![view(1, 0.75)],
            clients: vec![client],
            ..SystemSnapshot::empty()
        };
        assert!(MirrorConvergence.check(&state).is_ok());

        state.quiescent = true;
        assert!(MirrorConvergence.check(&state).is_err());
    }

    #[test]
    fn resurrected_mirror_entry_is_caught() {
        let client = ClientSnapshot {
            player: 1,
            mirror: vec![view(3, 0.0)],
            removed: BTreeSet::from([3]),
        };
        let state = SystemSnapshot { clients: vec![client], ..SystemSnapshot::empty() };
        assert!(TerminalNeverResurrected.check(&state).is_err());
    }

    #[test]
    fn nan_progress_is_out_of_range() {
        let state =
            SystemSnapshot { host_drops: vec![view(1, f32::NAN)], ..SystemSnapshot::empty() };
        assert!(ProgressInRange.check(&state).is_err());
    }
}
