//! Production runtime for the host driver.
//!
//! [`HostRuntime`] is a single actor: it owns the driver, one bus
//! subscription, a command queue and a tick interval, and handles exactly one
//! input at a time. Requests from every client are therefore applied in the
//! order the bus delivered them, with no locking around the registry.

use std::time::Duration;

use lootsync_core::{ConfigError, Environment, MessageBus, MessageSubscriber};
use lootsync_proto::{DropId, ItemSnapshot, Message, PlayerId, Position};
use tokio::sync::{mpsc, oneshot};

use crate::{
    driver::{HostAction, HostDriver, HostEvent},
    error::{HostError, LogLevel, Rejection},
    inventory::Inventory,
};

/// Commands for a running host.
#[derive(Debug)]
pub enum HostCommand {
    /// Spawn monster loot and report its id.
    SpawnMonsterLoot {
        /// Item to drop.
        item: ItemSnapshot,
        /// Where it lands.
        position: Position,
        /// Receives the new drop id, or why it was refused.
        reply: oneshot::Sender<Result<DropId, Rejection>>,
    },
    /// Drop a player's item on the host's initiative.
    DropItem {
        /// Owner of the new drop.
        owner: PlayerId,
        /// Item to drop.
        item: ItemSnapshot,
        /// Where it lands.
        position: Position,
        /// Receives the new drop id, or why it was refused.
        reply: oneshot::Sender<Result<DropId, Rejection>>,
    },
    /// Discard every drop.
    Cleanup,
    /// Stop the runtime after pending bus messages.
    Shutdown,
}

/// Cloneable handle to a running host.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::Sender<HostCommand>,
}

impl HostHandle {
    /// Spawn monster loot. Resolves once the `CREATED` broadcast is published.
    ///
    /// # Errors
    ///
    /// [`HostError::Refused`] when the position cannot be broadcast.
    pub async fn spawn_monster_loot(
        &self,
        item: ItemSnapshot,
        position: Position,
    ) -> Result<DropId, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::SpawnMonsterLoot { item, position, reply }).await?;
        rx.await.map_err(|_| HostError::Stopped)?.map_err(HostError::from)
    }

    /// Drop an item owned by `owner`.
    pub async fn drop_item(
        &self,
        owner: PlayerId,
        item: ItemSnapshot,
        position: Position,
    ) -> Result<DropId, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::DropItem { owner, item, position, reply }).await?;
        rx.await.map_err(|_| HostError::Stopped)?.map_err(HostError::from)
    }

    /// Discard every drop.
    pub async fn cleanup(&self) -> Result<(), HostError> {
        self.send(HostCommand::Cleanup).await
    }

    /// Ask the runtime to stop.
    pub async fn shutdown(&self) -> Result<(), HostError> {
        self.send(HostCommand::Shutdown).await
    }

    async fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.tx.send(command).await.map_err(|_| HostError::Stopped)
    }
}

/// Host actor.
pub struct HostRuntime<E, V, B>
where
    E: Environment,
    V: Inventory,
    B: MessageBus,
{
    driver: HostDriver<E, V>,
    bus: B,
    subscriber: B::Subscriber,
    commands: mpsc::Receiver<HostCommand>,
    tick: Duration,
}

impl<E, V, B> HostRuntime<E, V, B>
where
    E: Environment,
    V: Inventory + Send + 'static,
    B: MessageBus,
{
    /// Create the actor and its handle.
    ///
    /// Subscribes immediately, so requests published after this call are not
    /// missed even if [`HostRuntime::run`] starts later.
    pub fn new(
        driver: HostDriver<E, V>,
        bus: B,
        tick: Duration,
    ) -> Result<(Self, HostHandle), HostError> {
        if tick.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "tick" }.into());
        }
        let (tx, commands) = mpsc::channel(64);
        let subscriber = bus.subscribe();
        Ok((Self { driver, bus, subscriber, commands, tick }, HostHandle { tx }))
    }

    /// Run until shut down. Returns the driver for inspection.
    ///
    /// Bus messages are handled before commands when both are ready, so a
    /// shutdown issued after publishing requests sees those requests applied.
    pub async fn run(self) -> Result<HostDriver<E, V>, HostError> {
        let Self { mut driver, bus, mut subscriber, mut commands, tick } = self;

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(tick_ms = tick.as_millis(), "host runtime started");

        loop {
            tokio::select! {
                biased;

                message = subscriber.recv() => match message {
                    Some(Message::Request(request)) => {
                        let actions = driver.process_event(HostEvent::RequestReceived(request));
                        execute(&bus, actions);
                    },
                    // Our own broadcasts echoing back.
                    Some(Message::Broadcast(_)) => {},
                    None => return Err(HostError::ChannelClosed),
                },

                command = commands.recv() => match command {
                    Some(HostCommand::SpawnMonsterLoot { item, position, reply }) => {
                        let (drop_id, actions) = driver.spawn_monster_loot(item, position);
                        execute(&bus, actions);
                        let _ = reply.send(drop_id);
                    },
                    Some(HostCommand::DropItem { owner, item, position, reply }) => {
                        let (drop_id, actions) = driver.drop_item(owner, item, position);
                        execute(&bus, actions);
                        let _ = reply.send(drop_id);
                    },
                    Some(HostCommand::Cleanup) => {
                        execute(&bus, driver.process_event(HostEvent::Cleanup));
                    },
                    Some(HostCommand::Shutdown) | None => break,
                },

                _ = interval.tick() => {
                    execute(&bus, driver.process_event(HostEvent::Tick));
                },
            }
        }

        tracing::info!(drops = driver.drop_count(), "host runtime stopped");
        Ok(driver)
    }
}

fn execute<B: MessageBus>(bus: &B, actions: Vec<HostAction>) {
    for action in actions {
        match action {
            HostAction::Broadcast(broadcast) => bus.publish(&Message::Broadcast(broadcast)),
            HostAction::Log { level, message } => log(level, &message),
        }
    }
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{message}"),
        LogLevel::Info => tracing::info!("{message}"),
        LogLevel::Warn => tracing::warn!("{message}"),
        LogLevel::Error => tracing::error!("{message}"),
    }
}
