//! Lootsync wire protocol.
//!
//! Message types and the text codec for drop lifecycle traffic. The protocol
//! piggybacks on a game's chat channel: every message is a single line of
//! text, and lines without a protocol marker are ordinary chat that decoders
//! skip.
//!
//! # Components
//!
//! - [`Request`]: client-to-host commands (pickup, share, dismantle, drop)
//! - [`Broadcast`]: host-to-everyone state changes, carrying revisions so
//!   receivers can discard stale or duplicated deliveries
//! - [`decode`] / [`Message::encode`]: the line codec

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod item;
pub mod message;

pub use codec::{
    BROADCAST_CLOSE, BROADCAST_OPEN, BROADCAST_TAG, MAX_BONUSES, REQUEST_TAG, decode,
    decode_lossy, encode_broadcast, encode_request,
};
pub use errors::{DecodeError, Result};
pub use item::{DropId, ItemKind, ItemSnapshot, NO_OWNER, PlayerId, Position, Rarity, StatBonus};
pub use message::{Broadcast, BroadcastOpcode, DropSnapshot, Message, Request, RequestOpcode};
