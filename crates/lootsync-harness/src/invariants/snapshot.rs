//! Observable state extracted for invariant checks.

use std::{collections::BTreeSet, ops::Sub, time::Duration};

use lootsync_client::{Client, DropNotification, MirrorRecord};
use lootsync_core::Environment;
use lootsync_host::{DropRecord, HostDriver, MemoryInventory};
use lootsync_proto::{Broadcast, DropId, PlayerId};

/// The fields host and clients must agree on for one drop.
#[derive(Debug, Clone, PartialEq)]
pub struct DropView {
    /// Drop id.
    pub drop_id: DropId,
    /// Latest revision.
    pub revision: u64,
    /// Owner.
    pub owner: PlayerId,
    /// Shared flag.
    pub shared: bool,
    /// Dismantle progress.
    pub progress: f32,
}

impl<I> From<&DropRecord<I>> for DropView
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn from(record: &DropRecord<I>) -> Self {
        Self {
            drop_id: record.drop_id(),
            revision: record.revision(),
            owner: record.owner(),
            shared: record.is_shared(),
            progress: record.progress(),
        }
    }
}

impl From<&MirrorRecord> for DropView {
    fn from(record: &MirrorRecord) -> Self {
        Self {
            drop_id: record.drop_id,
            revision: record.revision,
            owner: record.owner,
            shared: record.shared,
            progress: record.progress,
        }
    }
}

/// One client's view.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    /// Player id.
    pub player: PlayerId,
    /// Mirrored live drops, in id order.
    pub mirror: Vec<DropView>,
    /// Drops this client was told are gone.
    pub removed: BTreeSet<DropId>,
}

impl ClientSnapshot {
    /// Extract from a client and the notifications it emitted.
    pub fn from_client<E: Environment>(
        client: &Client<E>,
        notifications: &[DropNotification],
    ) -> Self {
        let removed = notifications
            .iter()
            .filter(|n| {
                matches!(
                    n,
                    DropNotification::ItemPickedUp { .. } | DropNotification::ItemDismantled { .. }
                )
            })
            .map(DropNotification::drop_id)
            .collect();

        Self {
            player: client.player_id(),
            mirror: client.projector().iter().map(DropView::from).collect(),
            removed,
        }
    }
}

/// Whole-system state at one point in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    /// No lines are in flight.
    pub quiescent: bool,
    /// Host registry, in id order.
    pub host_drops: Vec<DropView>,
    /// Every client.
    pub clients: Vec<ClientSnapshot>,
    /// Every broadcast the host published, in order.
    pub history: Vec<Broadcast>,
    /// Items the host inventory granted.
    pub items_granted: usize,
    /// Currency the host inventory granted.
    pub currency_granted: u64,
}

impl SystemSnapshot {
    /// Nothing happened yet.
    pub fn empty() -> Self {
        Self {
            quiescent: true,
            host_drops: Vec::new(),
            clients: Vec::new(),
            history: Vec::new(),
            items_granted: 0,
            currency_granted: 0,
        }
    }

    /// Extract host-side state.
    pub fn from_host<E: Environment>(
        host: &HostDriver<E, MemoryInventory>,
        history: &[Broadcast],
    ) -> Self {
        Self {
            host_drops: host.registry().iter().map(DropView::from).collect(),
            history: history.to_vec(),
            items_granted: host.inventory().total_items(),
            currency_granted: host.inventory().total_currency(),
            ..Self::empty()
        }
    }
}
