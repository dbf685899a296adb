//! Deterministic simulation harness for lootsync.
//!
//! Seeded, single-threaded simulation of a host and several clients sharing
//! one chat channel that duplicates, reorders and pollutes traffic. A seed
//! fully determines the schedule, so every failure replays.
//!
//! # Components
//!
//! - [`SimEnv`]: virtual clock shared by every participant
//! - [`SimNetwork`]: fault-injecting broadcast channel
//! - [`Cluster`]: one host and N clients wired through the network
//! - [`sim_relay`]: TCP chat relay for turmoil-based tests
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold on every
//! schedule. Use [`InvariantRegistry::standard()`] for the drop lifecycle
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_env;
pub mod sim_network;
pub mod sim_relay;

pub use cluster::Cluster;
pub use invariants::{
    AtMostOnceGrant, ClientSnapshot, DropView, Invariant, InvariantRegistry, InvariantResult,
    MirrorConvergence, ProgressInRange, SystemSnapshot, TerminalNeverResurrected, Violation,
};
pub use sim_env::SimEnv;
pub use sim_network::{Endpoint, Faults, SimNetwork};
pub use sim_relay::{TurmoilEnv, serve_chat};
