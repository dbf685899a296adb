//! Lootsync host.
//!
//! The single authority over which drops exist. Clients only ever see
//! broadcasts; every state change happens here first.
//!
//! # Architecture
//!
//! The [`HostDriver`] follows the sans-IO pattern: it turns [`HostEvent`]s
//! into [`HostAction`]s without touching the network or the logger.
//! [`HostRuntime`] is the production actor that feeds it from a
//! [`lootsync_core::MessageBus`] and performs its actions.
//!
//! # Components
//!
//! - [`DropRegistry`]: authoritative table of active drops
//! - [`RequestRouter`]: validates and applies client requests
//! - [`DropReplayGuard`]: refuses replayed player `DROP` requests
//! - [`Inventory`]: collaborator receiving granted items and currency
//! - [`HostDriver`]: event-to-action orchestrator (pure logic, no I/O)
//! - [`HostRuntime`]: single-actor production loop
//! - [`SystemEnv`]: production clock and randomness

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod inventory;
mod registry;
mod replay;
mod router;
mod runtime;
mod system_env;

pub use config::HostConfig;
pub use driver::{HostAction, HostDriver, HostEvent};
pub use error::{HostError, LogLevel, Rejection};
pub use inventory::{Inventory, MemoryInventory};
pub use registry::{DropRecord, DropRegistry, NewDrop};
pub use replay::{DROP_WINDOW, DropReplayGuard, MAX_RETIRED_SESSIONS};
pub use router::RequestRouter;
pub use runtime::{HostCommand, HostHandle, HostRuntime};
pub use system_env::SystemEnv;
