//! Lootsync shared core.
//!
//! Pieces used by both the host and the clients:
//!
//! - [`env::Environment`]: clock abstraction so every timing rule runs under
//!   virtual time in simulation
//! - [`DismantleAccumulator`]: progressive dismantle state (authoritative on
//!   the host, optimistic on clients)
//! - [`dismantle_reward`]: currency paid for a dismantled item
//! - [`DropState`]: the per-drop lifecycle both sides agree on
//! - [`MessageBus`]: typed publish/subscribe over the shared chat channel

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod dismantle;
pub mod env;
pub mod error;
pub mod reward;
pub mod state;

pub use bus::{ChatChannel, ChatSubscriber, MessageBus, MessageSubscriber};
pub use dismantle::{DismantleAccumulator, DismantleRules, TapOutcome};
pub use env::Environment;
pub use error::ConfigError;
pub use reward::{base_reward, dismantle_reward};
pub use state::DropState;
