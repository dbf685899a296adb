//! Host driver.
//!
//! Sans-IO wrapper around the [`RequestRouter`]: events go in, actions come
//! out, and the caller (production runtime or simulation) performs them. The
//! driver never publishes or logs by itself, which keeps every outcome
//! observable in tests.

use std::fmt;

use lootsync_core::{ConfigError, Environment};
use lootsync_proto::{Broadcast, DropId, ItemSnapshot, PlayerId, Position, Request};

use crate::{
    config::HostConfig,
    error::{LogLevel, Rejection},
    inventory::Inventory,
    registry::{DropRegistry, NewDrop},
    router::RequestRouter,
};

/// Events the host driver processes.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A decoded request arrived on the channel.
    RequestReceived(Request),
    /// Periodic tick for dismantle decay.
    Tick,
    /// Session teardown: discard every drop silently.
    Cleanup,
}

/// Actions the host driver produces.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Publish to every participant.
    Broadcast(Broadcast),
    /// Log a message.
    Log {
        /// Log level.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}

impl HostAction {
    fn log(level: LogLevel, message: impl fmt::Display) -> Self {
        Self::Log { level, message: message.to_string() }
    }
}

/// Action-based host driver.
///
/// Generic over the environment (clock) and the inventory collaborator.
pub struct HostDriver<E, V>
where
    E: Environment,
    V: Inventory,
{
    router: RequestRouter<E::Instant>,
    inventory: V,
    env: E,
}

impl<E, V> HostDriver<E, V>
where
    E: Environment,
    V: Inventory,
{
    /// Create a driver with an empty registry.
    pub fn new(env: E, inventory: V, config: HostConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { router: RequestRouter::new(config), inventory, env })
    }

    /// Process one event and return the actions to perform, in order.
    pub fn process_event(&mut self, event: HostEvent) -> Vec<HostAction> {
        match event {
            HostEvent::RequestReceived(request) => self.handle_request(request),
            HostEvent::Tick => self.handle_tick(),
            HostEvent::Cleanup => {
                let discarded = self.router.cleanup();
                vec![HostAction::log(
                    LogLevel::Info,
                    format_args!("cleanup discarded {discarded} drop(s)"),
                )]
            },
        }
    }

    /// Create a drop on the host's own initiative.
    ///
    /// A refused drop yields only a log action; nothing is broadcast.
    pub fn create_drop(
        &mut self,
        drop: NewDrop,
    ) -> (Result<DropId, Rejection>, Vec<HostAction>) {
        let now = self.env.now();
        match self.router.create_drop(drop, now) {
            Ok((drop_id, created)) => {
                let log = HostAction::log(LogLevel::Debug, format_args!("created drop {drop_id}"));
                (Ok(drop_id), vec![log, HostAction::Broadcast(created)])
            },
            Err(rejection) => {
                let log =
                    HostAction::log(rejection.level(), format_args!("drop refused: {rejection}"));
                (Err(rejection), vec![log])
            },
        }
    }

    /// Drop a player's item into the world, unshared.
    pub fn drop_item(
        &mut self,
        owner: PlayerId,
        item: ItemSnapshot,
        position: Position,
    ) -> (Result<DropId, Rejection>, Vec<HostAction>) {
        self.create_drop(NewDrop::player(owner, item, position))
    }

    /// Spawn ownerless, shared monster loot.
    pub fn spawn_monster_loot(
        &mut self,
        item: ItemSnapshot,
        position: Position,
    ) -> (Result<DropId, Rejection>, Vec<HostAction>) {
        self.create_drop(NewDrop::monster_loot(item, position))
    }

    /// The inventory collaborator.
    pub fn inventory(&self) -> &V {
        &self.inventory
    }

    /// Mutable access to the inventory collaborator.
    pub fn inventory_mut(&mut self) -> &mut V {
        &mut self.inventory
    }

    /// The authoritative registry.
    pub fn registry(&self) -> &DropRegistry<E::Instant> {
        self.router.registry()
    }

    /// Number of active drops.
    pub fn drop_count(&self) -> usize {
        self.router.registry().len()
    }

    /// Environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    fn handle_request(&mut self, request: Request) -> Vec<HostAction> {
        let now = self.env.now();
        let opcode = request.opcode().as_str();
        let requester = request.requester();
        let target = request.drop_id();

        match self.router.route(request, now, &mut self.inventory) {
            Ok(broadcasts) => {
                let mut actions = Vec::with_capacity(broadcasts.len() + 1);
                actions.push(match target {
                    Some(drop_id) => HostAction::log(
                        LogLevel::Debug,
                        format_args!("{opcode} on drop {drop_id} by player {requester} applied"),
                    ),
                    None => HostAction::log(
                        LogLevel::Debug,
                        format_args!("{opcode} by player {requester} applied"),
                    ),
                });
                actions.extend(broadcasts.into_iter().map(HostAction::Broadcast));
                actions
            },
            Err(rejection) => vec![HostAction::log(
                rejection.level(),
                format_args!("{opcode} by player {requester} ignored: {rejection}"),
            )],
        }
    }

    fn handle_tick(&mut self) -> Vec<HostAction> {
        let now = self.env.now();
        self.router.decay(now).into_iter().map(HostAction::Broadcast).collect()
    }
}
