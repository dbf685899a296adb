//! Host error types.
//!
//! [`Rejection`] is not an error the requester ever sees. It is the reason a
//! request produced no state change, kept so the driver can log it at the
//! right level. [`HostError`] covers the runtime around the driver.

use std::time::Duration;

use lootsync_core::ConfigError;
use lootsync_proto::{DropId, ItemKind, PlayerId, Position};
use thiserror::Error;

/// Log levels for host actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Expected noise (stale references, duplicates).
    Debug,
    /// Notable but normal.
    Info,
    /// Likely a misbehaving client.
    Warn,
    /// Host-side fault.
    Error,
}

/// Why a request was not applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Drop doesn't exist (never did, or already removed).
    #[error("drop {drop_id} not found")]
    UnknownDrop {
        /// Requested drop.
        drop_id: DropId,
    },

    /// Requester doesn't own an unshared drop.
    #[error("player {requester} does not own drop {drop_id} (owner {owner})")]
    NotOwner {
        /// Requested drop.
        drop_id: DropId,
        /// Player asking.
        requester: PlayerId,
        /// Actual owner.
        owner: PlayerId,
    },

    /// Pickup before the drop's pickup delay elapsed.
    #[error("drop {drop_id} not pickable for another {remaining:?}")]
    PickupTooEarly {
        /// Requested drop.
        drop_id: DropId,
        /// Time left.
        remaining: Duration,
    },

    /// Requester's inventory refused the item.
    #[error("inventory of player {requester} is full, drop {drop_id} stays")]
    InventoryFull {
        /// Requested drop.
        drop_id: DropId,
        /// Player asking.
        requester: PlayerId,
    },

    /// Share of a drop that is already shared.
    #[error("drop {drop_id} already shared")]
    AlreadyShared {
        /// Requested drop.
        drop_id: DropId,
    },

    /// Share of an item kind that can't be shared.
    #[error("drop {drop_id} holds a {kind:?} item, which cannot be shared")]
    NotShareable {
        /// Requested drop.
        drop_id: DropId,
        /// Item kind.
        kind: ItemKind,
    },

    /// Dismantle of an item kind that can't be dismantled.
    #[error("drop {drop_id} holds a {kind:?} item, which cannot be dismantled")]
    NotDismantlable {
        /// Requested drop.
        drop_id: DropId,
        /// Item kind.
        kind: ItemKind,
    },

    /// Tap strength is NaN, infinite, zero or negative.
    #[error("invalid tap strength {strength} for drop {drop_id}")]
    InvalidStrength {
        /// Requested drop.
        drop_id: DropId,
        /// Strength as received.
        strength: f32,
    },

    /// Tap arrived within the minimum tap interval.
    #[error("tap on drop {drop_id} too soon after the previous one")]
    TapTooSoon {
        /// Requested drop.
        drop_id: DropId,
    },

    /// Drop request replayed.
    #[error("drop request {seq} from player {requester} already applied")]
    DuplicateDrop {
        /// Player asking.
        requester: PlayerId,
        /// Client sequence number.
        seq: u64,
    },

    /// Drop request from a retired session, or older than the replay window.
    #[error("drop request {seq} from player {requester} is stale")]
    StaleDrop {
        /// Player asking.
        requester: PlayerId,
        /// Client sequence number.
        seq: u64,
    },

    /// Drop position has a non-finite coordinate and could not be broadcast.
    #[error("drop position {position:?} is not finite")]
    InvalidPosition {
        /// Position as given.
        position: Position,
    },

    /// Drop request from the reserved "no owner" id.
    #[error("drop request without a requester")]
    NoRequester,
}

impl Rejection {
    /// Level this rejection should be logged at.
    pub const fn level(&self) -> LogLevel {
        match self {
            Self::UnknownDrop { .. }
            | Self::AlreadyShared { .. }
            | Self::TapTooSoon { .. }
            | Self::DuplicateDrop { .. }
            | Self::StaleDrop { .. }
            | Self::PickupTooEarly { .. } => LogLevel::Debug,
            Self::NotOwner { .. }
            | Self::InventoryFull { .. }
            | Self::NotShareable { .. }
            | Self::NotDismantlable { .. } => LogLevel::Info,
            Self::InvalidStrength { .. }
            | Self::InvalidPosition { .. }
            | Self::NoRequester => LogLevel::Warn,
        }
    }
}

/// Errors from the host runtime and binary.
#[derive(Error, Debug)]
pub enum HostError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The message bus closed under the runtime.
    #[error("message bus closed")]
    ChannelClosed,

    /// The host refused a command.
    #[error("refused: {0}")]
    Refused(#[from] Rejection),

    /// The runtime stopped before handling a command.
    #[error("host runtime stopped")]
    Stopped,

    /// Standard I/O failure in the binary.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
