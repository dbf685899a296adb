//! Client state machine.
//!
//! The `Client` turns player intents into requests and host broadcasts into
//! notifications. It never assumes a request took effect: the mirror only
//! changes when the matching broadcast arrives. The one exception is the
//! dismantle bar, which is predicted locally and corrected by the host.

use std::collections::HashMap;

use lootsync_core::{ConfigError, DismantleAccumulator, Environment, TapOutcome};
use lootsync_proto::{Broadcast, DropId, ItemSnapshot, PlayerId, Position, Request};

use crate::{
    config::ClientConfig,
    event::{ClientAction, ClientEvent, DropNotification},
    projector::ClientProjector,
    tracker::{Admission, PendingKind, PendingOperationTracker},
};

/// Client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Player id used as `requester` on every request.
    pub player_id: PlayerId,
}

impl ClientIdentity {
    /// Identity for `player_id`.
    pub fn new(player_id: PlayerId) -> Self {
        Self { player_id }
    }
}

/// Action-based client for one player.
pub struct Client<E: Environment> {
    /// Clock for request gating and tap timing.
    env: E,

    identity: ClientIdentity,

    config: ClientConfig,

    /// Host-confirmed drop state.
    projector: ClientProjector,

    /// Requests in flight and pickup cooldowns.
    tracker: PendingOperationTracker<E::Instant>,

    /// Local dismantle prediction per drop being tapped.
    taps: HashMap<DropId, DismantleAccumulator<E::Instant>>,

    /// Nonce sent with every `DROP`, drawn once per client lifetime.
    session: u64,

    /// Next `DROP` sequence number within `session`. Survives
    /// [`ClientEvent::Reset`] so the host never mistakes a new drop for a
    /// replay.
    next_seq: u64,
}

impl<E: Environment> Client<E> {
    /// Create a client with an empty mirror.
    pub fn new(
        env: E,
        identity: ClientIdentity,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let session = env.random_u64();
        Ok(Self {
            env,
            identity,
            config,
            projector: ClientProjector::new(identity.player_id),
            tracker: PendingOperationTracker::new(config.pending_ttl, config.pickup_cooldown),
            taps: HashMap::new(),
            session,
            next_seq: 1,
        })
    }

    /// This client's player id.
    pub fn player_id(&self) -> PlayerId {
        self.identity.player_id
    }

    /// Nonce identifying this client lifetime on `DROP` requests.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Host-confirmed mirror.
    pub fn projector(&self) -> &ClientProjector {
        &self.projector
    }

    /// Pending requests and cooldowns.
    pub fn tracker(&self) -> &PendingOperationTracker<E::Instant> {
        &self.tracker
    }

    /// Locally predicted dismantle progress. `None` if never tapped.
    pub fn local_progress(&self, drop_id: DropId) -> Option<f32> {
        self.taps.get(&drop_id).map(DismantleAccumulator::progress)
    }

    /// Process one event and return the actions to perform, in order.
    pub fn handle(&mut self, event: ClientEvent<E::Instant>) -> Vec<ClientAction> {
        match event {
            ClientEvent::BroadcastReceived(broadcast) => self.handle_broadcast(&broadcast),
            ClientEvent::Tick { now } => {
                self.handle_tick(now);
                Vec::new()
            },
            ClientEvent::RequestPickup { drop_id } => self.request_pickup(drop_id),
            ClientEvent::ShareItem { drop_id } => self.request_share(drop_id),
            ClientEvent::RequestDismantleTap { drop_id } => self.request_tap(drop_id),
            ClientEvent::RequestInstantDismantle { drop_id } => self.request_instant(drop_id),
            ClientEvent::DropItem { item, position } => vec![self.drop_item(item, position)],
            ClientEvent::Reset => {
                self.projector.clear();
                self.tracker.clear();
                self.taps.clear();
                Vec::new()
            },
        }
    }

    fn handle_broadcast(&mut self, broadcast: &Broadcast) -> Vec<ClientAction> {
        let now = self.env.now();
        let drop_id = broadcast.drop_id();

        match broadcast {
            Broadcast::ItemPickedUp { .. } | Broadcast::ItemDismantled { .. } => {
                self.tracker.resolve_all(drop_id, now);
                self.taps.remove(&drop_id);
            },
            Broadcast::ItemShared { .. } => {
                self.tracker.resolve(PendingKind::Share, drop_id, now);
            },
            Broadcast::DropCreated(_) | Broadcast::DismantleProgress { .. } => {},
        }

        let notifications = self.projector.apply(broadcast);

        if let Broadcast::DismantleProgress { .. } = broadcast
            && let (Some(record), Some(local)) =
                (self.projector.get(drop_id), self.taps.get_mut(&drop_id))
        {
            local.sync(record.progress);
        }

        notifications.into_iter().map(ClientAction::Notify).collect()
    }

    fn handle_tick(&mut self, now: E::Instant) {
        for (kind, drop_id) in self.tracker.expire(now) {
            tracing::debug!(?kind, drop_id, "request expired without an answer");
        }
        let rules = self.config.dismantle;
        for local in self.taps.values_mut() {
            local.decay(now, &rules);
        }
    }

    fn request_pickup(&mut self, drop_id: DropId) -> Vec<ClientAction> {
        if let Some(record) = self.projector.get(drop_id)
            && !record.can_pick_up(self.player_id())
        {
            tracing::debug!(drop_id, owner = record.owner, "not ours and not shared");
            return Vec::new();
        }
        let request = Request::Pickup { drop_id, requester: self.player_id() };
        self.send_gated(PendingKind::Pickup, drop_id, request)
    }

    fn request_share(&mut self, drop_id: DropId) -> Vec<ClientAction> {
        if let Some(record) = self.projector.get(drop_id) {
            if record.shared {
                return Vec::new();
            }
            if record.owner != self.player_id() || !record.item.kind.can_share() {
                tracing::debug!(drop_id, "cannot share this drop");
                return Vec::new();
            }
        }
        let request = Request::Share { drop_id, requester: self.player_id() };
        self.send_gated(PendingKind::Share, drop_id, request)
    }

    fn request_tap(&mut self, drop_id: DropId) -> Vec<ClientAction> {
        if self.projector.is_removed(drop_id) || !self.dismantlable(drop_id) {
            return Vec::new();
        }

        let now = self.env.now();
        let confirmed = self.projector.get(drop_id).map_or(0.0, |r| r.progress);
        let local = self.taps.entry(drop_id).or_insert_with(|| {
            let mut fresh = DismantleAccumulator::new();
            fresh.sync(confirmed);
            fresh
        });
        // A completed prediction the host never confirmed starts over from the
        // confirmed value.
        if local.is_complete() {
            local.sync(confirmed);
        }

        let progress = match local.tap(self.config.tap_strength, now, &self.config.dismantle) {
            TapOutcome::TooSoon | TapOutcome::AlreadyComplete => return Vec::new(),
            TapOutcome::Advanced { progress } => progress,
            TapOutcome::Completed => 1.0,
        };

        vec![
            ClientAction::Notify(DropNotification::DismantleProgress {
                drop_id,
                progress,
                optimistic: true,
            }),
            ClientAction::Send(Request::DismantleTap {
                drop_id,
                requester: self.player_id(),
                strength: self.config.tap_strength,
            }),
        ]
    }

    fn request_instant(&mut self, drop_id: DropId) -> Vec<ClientAction> {
        if !self.dismantlable(drop_id) {
            return Vec::new();
        }
        let request = Request::InstantDismantle { drop_id, requester: self.player_id() };
        self.send_gated(PendingKind::InstantDismantle, drop_id, request)
    }

    fn drop_item(&mut self, item: ItemSnapshot, position: Position) -> ClientAction {
        let seq = self.next_seq;
        self.next_seq += 1;
        ClientAction::Send(Request::Drop {
            requester: self.player_id(),
            session: self.session,
            seq,
            item,
            position,
        })
    }

    /// Unknown drops are assumed dismantlable; the host has the final say.
    fn dismantlable(&self, drop_id: DropId) -> bool {
        self.projector.get(drop_id).is_none_or(|r| r.item.kind.can_dismantle())
    }

    fn send_gated(
        &mut self,
        kind: PendingKind,
        drop_id: DropId,
        request: Request,
    ) -> Vec<ClientAction> {
        if self.projector.is_removed(drop_id) {
            tracing::debug!(?kind, drop_id, "drop already gone");
            return Vec::new();
        }

        match self.tracker.try_begin(kind, drop_id, self.env.now()) {
            Admission::Admitted => vec![ClientAction::Send(request)],
            Admission::AlreadyPending => Vec::new(),
            Admission::CoolingDown { remaining } => {
                tracing::debug!(drop_id, ?remaining, "pickup cooling down");
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use lootsync_proto::{DropSnapshot, ItemKind, Rarity};

    use super::*;

    const ME: PlayerId = 3;
    const OTHER: PlayerId = 4;

    #[derive(Clone, Default)]
    struct ManualClock {
        now: Arc<Mutex<Duration>>,
        draws: Arc<AtomicU64>,
    }

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Environment for ManualClock {
        type Instant = Duration;

        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let draw = self.draws.fetch_add(1, Ordering::SeqCst) + 1;
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = draw.to_be_bytes()[i % 8];
            }
        }
    }

    fn client() -> (Client<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let client =
            Client::new(clock.clone(), ClientIdentity::new(ME), ClientConfig::default()).unwrap();
        (client, clock)
    }

    fn created(drop_id: DropId, owner: PlayerId, kind: ItemKind) -> ClientEvent<Duration> {
        ClientEvent::BroadcastReceived(Broadcast::DropCreated(DropSnapshot {
            drop_id,
            revision: 0,
            owner,
            shared: false,
            monster: false,
            progress: 0.0,
            position: Position::ORIGIN,
            item: ItemSnapshot::new(10, kind, Rarity::Common),
        }))
    }

    fn sent(actions: &[ClientAction]) -> Vec<Request> {
        actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Send(r) => Some(r.clone()),
                ClientAction::Notify(_) => None,
            })
            .collect()
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = ClientConfig { tap_strength: 0.0, ..ClientConfig::default() };
        assert!(Client::new(ManualClock::default(), ClientIdentity::new(ME), config).is_err());
    }

    #[test]
    fn double_trigger_sends_one_pickup() {
        let (mut client, _) = client();
        client.handle(created(1, ME, ItemKind::Equipment));

        let first = client.handle(ClientEvent::RequestPickup { drop_id: 1 });
        let second = client.handle(ClientEvent::RequestPickup { drop_id: 1 });

        assert_eq!(sent(&first), vec![Request::Pickup { drop_id: 1, requester: ME }]);
        assert!(second.is_empty());
    }

    #[test]
    fn foreign_unshared_drop_is_not_requested() {
        let (mut client, _) = client();
        client.handle(created(1, OTHER, ItemKind::Equipment));
        assert!(client.handle(ClientEvent::RequestPickup { drop_id: 1 }).is_empty());
        assert!(client.handle(ClientEvent::ShareItem { drop_id: 1 }).is_empty());
    }

    #[test]
    fn pickup_broadcast_resolves_and_blocks_retries() {
        let (mut client, clock) = client();
        client.handle(created(1, ME, ItemKind::Equipment));
        client.handle(ClientEvent::RequestPickup { drop_id: 1 });

        let actions = client.handle(ClientEvent::BroadcastReceived(Broadcast::ItemPickedUp {
            drop_id: 1,
            requester: ME,
        }));
        assert_eq!(
            actions,
            vec![ClientAction::Notify(DropNotification::ItemPickedUp {
                drop_id: 1,
                picked_up_by: ME,
                by_local_player: true
            })]
        );
        assert_eq!(client.tracker().pending_count(), 0);

        clock.advance(Duration::from_secs(5));
        assert!(client.handle(ClientEvent::RequestPickup { drop_id: 1 }).is_empty());
    }

    #[test]
    fn taps_predict_progress_and_respect_interval() {
        let (mut client, clock) = client();
        client.handle(created(1, OTHER, ItemKind::Equipment));

        let first = client.handle(ClientEvent::RequestDismantleTap { drop_id: 1 });
        assert_eq!(
            first[0],
            ClientAction::Notify(DropNotification::DismantleProgress {
                drop_id: 1,
                progress: 0.25,
                optimistic: true
            })
        );
        assert_eq!(
            sent(&first),
            vec![Request::DismantleTap { drop_id: 1, requester: ME, strength: 0.25 }]
        );

        clock.advance(Duration::from_millis(10));
        assert!(client.handle(ClientEvent::RequestDismantleTap { drop_id: 1 }).is_empty());

        clock.advance(Duration::from_millis(100));
        client.handle(ClientEvent::RequestDismantleTap { drop_id: 1 });
        assert_eq!(client.local_progress(1), Some(0.5));
    }

    #[test]
    fn host_progress_overrides_prediction() {
        let (mut client, _) = client();
        client.handle(created(1, ME, ItemKind::Equipment));
        client.handle(ClientEvent::RequestDismantleTap { drop_id: 1 });

        let actions = client.handle(ClientEvent::BroadcastReceived(Broadcast::DismantleProgress {
            drop_id: 1,
            revision: 1,
            progress: 0.0,
        }));
        assert_eq!(
            actions,
            vec![ClientAction::Notify(DropNotification::DismantleProgress {
                drop_id: 1,
                progress: 0.0,
                optimistic: false
            })]
        );
        assert_eq!(client.local_progress(1), Some(0.0));
    }

    #[test]
    fn materials_are_not_dismantled() {
        let (mut client, _) = client();
        client.handle(created(1, ME, ItemKind::Material));
        assert!(client.handle(ClientEvent::RequestDismantleTap { drop_id: 1 }).is_empty());
        assert!(client.handle(ClientEvent::RequestInstantDismantle { drop_id: 1 }).is_empty());
    }

    #[test]
    fn drops_get_increasing_sequence_numbers() {
        let (mut client, _) = client();
        let item = ItemSnapshot::new(5, ItemKind::Consumable, Rarity::Common);
        let mut seqs = Vec::new();
        for _ in 0..2 {
            let actions = client.handle(ClientEvent::DropItem {
                item: item.clone(),
                position: Position::ORIGIN,
            });
            client.handle(ClientEvent::Reset);
            if let [ClientAction::Send(Request::Drop { seq, session, requester, .. })] = actions[..]
            {
                assert_eq!(requester, ME);
                assert_eq!(session, client.session());
                seqs.push(seq);
            }
        }
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn restarted_client_drops_under_a_new_session() {
        let clock = ManualClock::default();
        let item = ItemSnapshot::new(5, ItemKind::Consumable, Rarity::Common);

        let mut keys = Vec::new();
        for _ in 0..2 {
            let mut client =
                Client::new(clock.clone(), ClientIdentity::new(ME), ClientConfig::default())
                    .unwrap();
            let actions = client.handle(ClientEvent::DropItem {
                item: item.clone(),
                position: Position::ORIGIN,
            });
            if let [ClientAction::Send(Request::Drop { session, seq, .. })] = actions[..] {
                keys.push((session, seq));
            }
        }

        assert_eq!(keys.len(), 2);
        assert_eq!((keys[0].1, keys[1].1), (1, 1));
        assert_ne!(keys[0].0, keys[1].0);
    }

    #[test]
    fn reset_forgets_drops_and_requests() {
        let (mut client, _) = client();
        client.handle(created(1, ME, ItemKind::Equipment));
        client.handle(ClientEvent::RequestPickup { drop_id: 1 });

        client.handle(ClientEvent::Reset);
        assert!(client.projector().is_empty());
        assert_eq!(client.tracker().pending_count(), 0);
    }

    #[test]
    fn expired_pickup_can_be_retried_after_cooldown() {
        let (mut client, clock) = client();
        client.handle(created(1, ME, ItemKind::Equipment));
        client.handle(ClientEvent::RequestPickup { drop_id: 1 });

        clock.advance(Duration::from_secs(1));
        client.handle(ClientEvent::Tick { now: clock.now() });
        assert!(client.handle(ClientEvent::RequestPickup { drop_id: 1 }).is_empty());

        clock.advance(Duration::from_secs(2));
        assert_eq!(client.handle(ClientEvent::RequestPickup { drop_id: 1 }).len(), 1);
    }
}
