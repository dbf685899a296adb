//! Client events and actions.

use lootsync_proto::{Broadcast, DropId, ItemSnapshot, PlayerId, Position, Request};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving broadcasts from the channel
/// - Driving time forward via ticks
/// - Forwarding player intents (pickup, share, dismantle, drop)
///
/// Generic over `I` (instant type) so production and simulation clocks both
/// work.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Broadcast received from the host.
    BroadcastReceived(Broadcast),

    /// Time tick for expiring pending requests.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Player wants to pick a drop up.
    RequestPickup {
        /// Target drop.
        drop_id: DropId,
    },

    /// Player wants to open their drop to everyone.
    ShareItem {
        /// Target drop.
        drop_id: DropId,
    },

    /// Player tapped the dismantle action once.
    RequestDismantleTap {
        /// Target drop.
        drop_id: DropId,
    },

    /// Player used the one-step dismantle.
    RequestInstantDismantle {
        /// Target drop.
        drop_id: DropId,
    },

    /// Player dropped an item from their inventory.
    DropItem {
        /// Item being dropped.
        item: ItemSnapshot,
        /// Where it lands.
        position: Position,
    },

    /// Session teardown: forget every drop and pending request.
    Reset,
}

/// Typed notifications for the presentation layer.
///
/// The presentation layer keeps only drop ids and looks current state up in
/// the projector when it needs more.
#[derive(Debug, Clone, PartialEq)]
pub enum DropNotification {
    /// A drop appeared.
    ItemDropped {
        /// New drop.
        drop_id: DropId,
        /// Its item.
        item: ItemSnapshot,
        /// Where it is.
        position: Position,
    },

    /// A drop was claimed and is gone.
    ItemPickedUp {
        /// Removed drop.
        drop_id: DropId,
        /// Player who received it.
        picked_up_by: PlayerId,
        /// Whether that was us. The host has already granted the item; the
        /// local inventory must not add it again.
        by_local_player: bool,
    },

    /// A drop became claimable by anyone.
    ItemShared {
        /// Affected drop.
        drop_id: DropId,
    },

    /// Dismantle progress changed.
    DismantleProgress {
        /// Affected drop.
        drop_id: DropId,
        /// New progress in `[0, 1]`.
        progress: f32,
        /// Local prediction, not yet confirmed by the host.
        optimistic: bool,
    },

    /// A drop was dismantled and is gone.
    ItemDismantled {
        /// Removed drop.
        drop_id: DropId,
        /// Currency granted.
        reward: u64,
    },
}

impl DropNotification {
    /// Drop this notification refers to.
    pub const fn drop_id(&self) -> DropId {
        match self {
            Self::ItemDropped { drop_id, .. }
            | Self::ItemPickedUp { drop_id, .. }
            | Self::ItemShared { drop_id }
            | Self::DismantleProgress { drop_id, .. }
            | Self::ItemDismantled { drop_id, .. } => *drop_id,
        }
    }
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Publish a request on the channel.
    Send(Request),

    /// Hand a notification to the presentation layer.
    Notify(DropNotification),
}
