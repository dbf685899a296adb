//! Lootsync client.
//!
//! Action-based client state machine for the drop protocol. Player intents
//! become requests, host broadcasts become notifications for the
//! presentation layer.
//!
//! # Architecture
//!
//! The client follows the same sans-IO pattern as the host driver. It
//! receives events ([`ClientEvent`]), processes them through pure state
//! machine logic, and returns actions ([`ClientAction`]) for the caller to
//! execute.
//!
//! # Components
//!
//! - [`Client`]: top-level state machine for one player
//! - [`ClientProjector`]: read-only mirror of host drop state
//! - [`PendingOperationTracker`]: suppresses duplicate requests before they
//!   are sent
//! - [`DropNotification`]: typed callbacks for the presentation layer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod event;
mod projector;
mod tracker;

pub use client::{Client, ClientIdentity};
pub use config::ClientConfig;
pub use event::{ClientAction, ClientEvent, DropNotification};
pub use lootsync_core::Environment;
pub use projector::{ClientProjector, MAX_DEFERRED, MAX_TOMBSTONES, MirrorRecord};
pub use tracker::{Admission, PendingKind, PendingOperationTracker};
