//! One host and N clients over a simulated chat channel.
//!
//! Everything runs on one thread under one virtual clock. The test decides
//! when lines are delivered and when time moves, so a seed fully determines
//! the run.

use std::time::Duration;

use lootsync_client::{
    Client, ClientAction, ClientConfig, ClientEvent, ClientIdentity, DropNotification,
};
use lootsync_core::{ConfigError, Environment};
use lootsync_host::{
    HostAction, HostConfig, HostDriver, HostEvent, LogLevel, MemoryInventory, Rejection,
};
use lootsync_proto::{Broadcast, DropId, ItemSnapshot, Message, PlayerId, Position, decode_lossy};

use crate::{
    SimEnv,
    invariants::{ClientSnapshot, SystemSnapshot},
    sim_network::{Faults, SimNetwork},
};

/// Upper bound on deliveries in one [`Cluster::run_until_idle`].
const MAX_DELIVERIES: usize = 100_000;

/// Simulated session.
pub struct Cluster {
    env: SimEnv,
    network: SimNetwork,
    host: HostDriver<SimEnv, MemoryInventory>,
    clients: Vec<Client<SimEnv>>,
    notifications: Vec<Vec<DropNotification>>,
    history: Vec<Broadcast>,
    transcript: Vec<String>,
}

impl Cluster {
    /// Cluster with default settings. Client `i` is player `i + 1`.
    pub fn new(seed: u64, num_clients: usize, faults: Faults) -> Result<Self, ConfigError> {
        Self::with_config(seed, num_clients, faults, HostConfig::default(), ClientConfig::default())
    }

    /// Cluster with explicit host and client settings.
    pub fn with_config(
        seed: u64,
        num_clients: usize,
        faults: Faults,
        host_config: HostConfig,
        client_config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        let env = SimEnv::with_seed(seed);
        let host = HostDriver::new(env.clone(), MemoryInventory::new(), host_config)?;
        let clients = (0..num_clients)
            .map(|i| {
                let identity = ClientIdentity::new(Self::player(i));
                Client::new(env.clone(), identity, client_config)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            network: SimNetwork::new(seed, num_clients + 1, faults),
            env,
            host,
            clients,
            notifications: vec![Vec::new(); num_clients],
            history: Vec::new(),
            transcript: Vec::new(),
        })
    }

    /// Player id of client `index`.
    pub fn player(index: usize) -> PlayerId {
        index as PlayerId + 1
    }

    /// Shared clock and random stream.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The host driver.
    pub fn host(&self) -> &HostDriver<SimEnv, MemoryInventory> {
        &self.host
    }

    /// Client `index`.
    pub fn client(&self, index: usize) -> &Client<SimEnv> {
        &self.clients[index]
    }

    /// Number of clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Notifications client `index` has emitted, in order.
    pub fn notifications(&self, index: usize) -> &[DropNotification] {
        &self.notifications[index]
    }

    /// Every broadcast the host published, in order.
    pub fn history(&self) -> &[Broadcast] {
        &self.history
    }

    /// Every protocol line published, requests and broadcasts, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// The simulated channel.
    pub fn network(&self) -> &SimNetwork {
        &self.network
    }

    /// Spawn monster loot on the host.
    pub fn spawn_monster_loot(
        &mut self,
        item: ItemSnapshot,
        position: Position,
    ) -> Result<DropId, Rejection> {
        let (drop_id, actions) = self.host.spawn_monster_loot(item, position);
        self.execute_host(actions);
        drop_id
    }

    /// Drop an item owned by client `owner` on the host's initiative.
    pub fn drop_item(
        &mut self,
        owner: usize,
        item: ItemSnapshot,
        position: Position,
    ) -> Result<DropId, Rejection> {
        let (drop_id, actions) = self.host.drop_item(Self::player(owner), item, position);
        self.execute_host(actions);
        drop_id
    }

    /// Feed an event to client `index` and publish what it sends.
    pub fn client_event(&mut self, index: usize, event: ClientEvent<Duration>) {
        let actions = self.clients[index].handle(event);
        self.execute_client(index, actions);
    }

    /// Deliver one line. Returns `false` if nothing was in flight.
    pub fn deliver_one(&mut self) -> bool {
        let Some((endpoint, line)) = self.network.next_delivery() else {
            return false;
        };

        match (endpoint, decode_lossy(&line)) {
            (0, Some(Message::Request(request))) => {
                let actions = self.host.process_event(HostEvent::RequestReceived(request));
                self.execute_host(actions);
            },
            (0, _) | (_, None | Some(Message::Request(_))) => {},
            (endpoint, Some(Message::Broadcast(broadcast))) => {
                let index = endpoint - 1;
                let actions = self.clients[index].handle(ClientEvent::BroadcastReceived(broadcast));
                self.execute_client(index, actions);
            },
        }
        true
    }

    /// Deliver until nothing is in flight. Returns the number delivered.
    pub fn run_until_idle(&mut self) -> usize {
        let mut delivered = 0;
        while delivered < MAX_DELIVERIES && self.deliver_one() {
            delivered += 1;
        }
        if delivered == MAX_DELIVERIES {
            tracing::warn!(in_flight = self.network.in_flight(), "delivery bound reached");
        }
        delivered
    }

    /// Move time forward and tick the host and every client.
    pub fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        let actions = self.host.process_event(HostEvent::Tick);
        self.execute_host(actions);

        let now = self.env.now();
        for index in 0..self.clients.len() {
            self.client_event(index, ClientEvent::Tick { now });
        }
    }

    /// Observable state for invariant checks.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            quiescent: self.network.is_idle(),
            clients: self
                .clients
                .iter()
                .zip(&self.notifications)
                .map(|(client, notes)| ClientSnapshot::from_client(client, notes))
                .collect(),
            ..SystemSnapshot::from_host(&self.host, &self.history)
        }
    }

    fn execute_host(&mut self, actions: Vec<HostAction>) {
        for action in actions {
            match action {
                HostAction::Broadcast(broadcast) => {
                    let line = Message::Broadcast(broadcast.clone()).encode();
                    self.history.push(broadcast);
                    self.publish(line);
                },
                HostAction::Log { level, message } => log(level, &message),
            }
        }
    }

    fn execute_client(&mut self, index: usize, actions: Vec<ClientAction>) {
        for action in actions {
            match action {
                ClientAction::Send(request) => self.publish(Message::Request(request).encode()),
                ClientAction::Notify(notification) => self.notifications[index].push(notification),
            }
        }
    }

    fn publish(&mut self, line: String) {
        self.network.publish(&line);
        self.transcript.push(line);
    }
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: "lootsync_host", "{message}"),
        LogLevel::Info => tracing::info!(target: "lootsync_host", "{message}"),
        LogLevel::Warn => tracing::warn!(target: "lootsync_host", "{message}"),
        LogLevel::Error => tracing::error!(target: "lootsync_host", "{message}"),
    }
}
