//! Protocol messages.
//!
//! Two disjoint families share one channel: client-to-host [`Request`]s and
//! host-to-everyone [`Broadcast`]s. Every variant maps to exactly one opcode.

use crate::item::{DropId, ItemSnapshot, PlayerId, Position};

/// Opcodes for client requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOpcode {
    /// Claim a drop.
    Pickup,
    /// Open an owned drop to everyone.
    Share,
    /// Add dismantle progress.
    Tap,
    /// Dismantle in one step.
    Instant,
    /// Drop an item from the requester's inventory.
    Drop,
}

impl RequestOpcode {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "PICKUP",
            Self::Share => "SHARE",
            Self::Tap => "TAP",
            Self::Instant => "INSTANT",
            Self::Drop => "DROP",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PICKUP" => Some(Self::Pickup),
            "SHARE" => Some(Self::Share),
            "TAP" => Some(Self::Tap),
            "INSTANT" => Some(Self::Instant),
            "DROP" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// Opcodes for host broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastOpcode {
    /// A drop appeared.
    Created,
    /// A drop was claimed.
    PickedUp,
    /// A drop was opened to everyone.
    Shared,
    /// Dismantle progress changed.
    Progress,
    /// A drop was dismantled into currency.
    Dismantled,
}

impl BroadcastOpcode {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::PickedUp => "PICKEDUP",
            Self::Shared => "SHARED",
            Self::Progress => "PROGRESS",
            Self::Dismantled => "DISMANTLED",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "CREATED" => Some(Self::Created),
            "PICKEDUP" => Some(Self::PickedUp),
            "SHARED" => Some(Self::Shared),
            "PROGRESS" => Some(Self::Progress),
            "DISMANTLED" => Some(Self::Dismantled),
            _ => None,
        }
    }
}

/// Client-to-host request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Move the drop's item into the requester's inventory.
    Pickup {
        /// Target drop.
        drop_id: DropId,
        /// Player asking.
        requester: PlayerId,
    },
    /// Make an owned drop claimable by anyone.
    Share {
        /// Target drop.
        drop_id: DropId,
        /// Player asking (must be the owner).
        requester: PlayerId,
    },
    /// Contribute dismantle progress.
    DismantleTap {
        /// Target drop.
        drop_id: DropId,
        /// Player tapping. Receives the reward on completion.
        requester: PlayerId,
        /// Progress to add, in `(0, 1]`.
        strength: f32,
    },
    /// Dismantle without accumulating taps.
    InstantDismantle {
        /// Target drop.
        drop_id: DropId,
        /// Player receiving the reward.
        requester: PlayerId,
    },
    /// Put an item from the requester's inventory into the world.
    Drop {
        /// Player dropping (becomes the owner).
        requester: PlayerId,
        /// Random per-client-lifetime nonce, so a restarted client never
        /// collides with sequence numbers it used before.
        session: u64,
        /// Client-local sequence number within `session`; replays are ignored.
        seq: u64,
        /// Item being dropped.
        item: ItemSnapshot,
        /// Where it lands.
        position: Position,
    },
}

impl Request {
    /// Opcode for this request.
    pub const fn opcode(&self) -> RequestOpcode {
        match self {
            Self::Pickup { .. } => RequestOpcode::Pickup,
            Self::Share { .. } => RequestOpcode::Share,
            Self::DismantleTap { .. } => RequestOpcode::Tap,
            Self::InstantDismantle { .. } => RequestOpcode::Instant,
            Self::Drop { .. } => RequestOpcode::Drop,
        }
    }

    /// Drop this request targets. `None` for [`Request::Drop`], whose id
    /// does not exist yet.
    pub const fn drop_id(&self) -> Option<DropId> {
        match self {
            Self::Pickup { drop_id, .. }
            | Self::Share { drop_id, .. }
            | Self::DismantleTap { drop_id, .. }
            | Self::InstantDismantle { drop_id, .. } => Some(*drop_id),
            Self::Drop { .. } => None,
        }
    }

    /// Player who sent the request.
    pub const fn requester(&self) -> PlayerId {
        match self {
            Self::Pickup { requester, .. }
            | Self::Share { requester, .. }
            | Self::DismantleTap { requester, .. }
            | Self::InstantDismantle { requester, .. }
            | Self::Drop { requester, .. } => *requester,
        }
    }
}

/// Full state of a drop, sent when it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct DropSnapshot {
    /// Drop id.
    pub drop_id: DropId,
    /// Host revision of the record.
    pub revision: u64,
    /// Player who caused the drop, or [`crate::NO_OWNER`].
    pub owner: PlayerId,
    /// Whether anyone may claim it.
    pub shared: bool,
    /// Whether it came from a monster.
    pub monster: bool,
    /// Dismantle progress in `[0, 1]`.
    pub progress: f32,
    /// World position.
    pub position: Position,
    /// The item.
    pub item: ItemSnapshot,
}

/// Host-to-everyone broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast {
    /// A drop exists.
    DropCreated(DropSnapshot),
    /// A drop was claimed and removed.
    ItemPickedUp {
        /// Removed drop.
        drop_id: DropId,
        /// Player who received the item.
        requester: PlayerId,
    },
    /// A drop is now claimable by anyone.
    ItemShared {
        /// Affected drop.
        drop_id: DropId,
        /// Host revision after the change.
        revision: u64,
    },
    /// Dismantle progress changed (including decay back to zero).
    DismantleProgress {
        /// Affected drop.
        drop_id: DropId,
        /// Host revision after the change.
        revision: u64,
        /// New progress in `[0, 1]`.
        progress: f32,
    },
    /// A drop was dismantled and removed.
    ItemDismantled {
        /// Removed drop.
        drop_id: DropId,
        /// Currency granted.
        reward: u64,
    },
}

impl Broadcast {
    /// Opcode for this broadcast.
    pub const fn opcode(&self) -> BroadcastOpcode {
        match self {
            Self::DropCreated(_) => BroadcastOpcode::Created,
            Self::ItemPickedUp { .. } => BroadcastOpcode::PickedUp,
            Self::ItemShared { .. } => BroadcastOpcode::Shared,
            Self::DismantleProgress { .. } => BroadcastOpcode::Progress,
            Self::ItemDismantled { .. } => BroadcastOpcode::Dismantled,
        }
    }

    /// Drop this broadcast refers to.
    pub const fn drop_id(&self) -> DropId {
        match self {
            Self::DropCreated(snapshot) => snapshot.drop_id,
            Self::ItemPickedUp { drop_id, .. }
            | Self::ItemShared { drop_id, .. }
            | Self::DismantleProgress { drop_id, .. }
            | Self::ItemDismantled { drop_id, .. } => *drop_id,
        }
    }

    /// Whether the drop no longer exists after this broadcast.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ItemPickedUp { .. } | Self::ItemDismantled { .. })
    }
}

/// Anything the codec can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client-to-host.
    Request(Request),
    /// Host-to-everyone.
    Broadcast(Broadcast),
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Broadcast> for Message {
    fn from(broadcast: Broadcast) -> Self {
        Self::Broadcast(broadcast)
    }
}
