//! Request validation and application.
//!
//! The router owns the [`DropRegistry`] and is the only thing that mutates
//! it. Requests are applied one at a time in arrival order; that single
//! serialization point is what makes the first of two racing pickups win and
//! the second find nothing.
//!
//! Every handler checks the record exists before anything else. Once a record
//! is removed, any later request naming it is [`Rejection::UnknownDrop`], so
//! redelivered requests can never grant twice. `DROP` requests carry no drop
//! id; they go through a [`DropReplayGuard`] instead.

use std::{ops::Sub, time::Duration};

use lootsync_core::{TapOutcome, dismantle_reward, env::elapsed};
use lootsync_proto::{Broadcast, DropId, NO_OWNER, PlayerId, Position, Request};

use crate::{
    config::HostConfig,
    error::Rejection,
    inventory::Inventory,
    registry::{DropRegistry, NewDrop},
    replay::DropReplayGuard,
};

/// Applies requests against the authoritative registry.
#[derive(Debug, Clone)]
pub struct RequestRouter<I> {
    registry: DropRegistry<I>,
    config: HostConfig,
    /// Applied `DROP` requests. Outlives [`RequestRouter::cleanup`].
    replays: DropReplayGuard,
}

impl<I> RequestRouter<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Router over an empty registry.
    pub fn new(config: HostConfig) -> Self {
        Self { registry: DropRegistry::new(), config, replays: DropReplayGuard::new() }
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &DropRegistry<I> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Replay protection state for `DROP` requests.
    pub fn replays(&self) -> &DropReplayGuard {
        &self.replays
    }

    /// Create a drop and return its id and `CREATED` broadcast.
    ///
    /// Refuses positions that could not be encoded for clients.
    pub fn create_drop(&mut self, drop: NewDrop, now: I) -> Result<(DropId, Broadcast), Rejection> {
        check_position(drop.position)?;
        let record = self.registry.insert(drop, now);
        Ok((record.drop_id(), Broadcast::DropCreated(record.snapshot())))
    }

    /// Apply one request.
    ///
    /// On success returns the broadcasts to publish, in order. A rejection
    /// leaves the registry and the inventory untouched.
    pub fn route(
        &mut self,
        request: Request,
        now: I,
        inventory: &mut impl Inventory,
    ) -> Result<Vec<Broadcast>, Rejection> {
        match request {
            Request::Pickup { drop_id, requester } => {
                self.pickup(drop_id, requester, now, inventory)
            },
            Request::Share { drop_id, requester } => self.share(drop_id, requester),
            Request::DismantleTap { drop_id, requester, strength } => {
                self.tap(drop_id, requester, strength, now, inventory)
            },
            Request::InstantDismantle { drop_id, requester } => {
                self.instant_dismantle(drop_id, requester, inventory)
            },
            Request::Drop { requester, session, seq, item, position } => {
                if requester == NO_OWNER {
                    return Err(Rejection::NoRequester);
                }
                check_position(position)?;
                self.replays.admit(requester, session, seq)?;
                let (_, created) =
                    self.create_drop(NewDrop::player(requester, item, position), now)?;
                Ok(vec![created])
            },
        }
    }

    /// Reset progress on drops left idle past the decay window.
    ///
    /// Returns one `PROGRESS 0` broadcast per reset drop.
    pub fn decay(&mut self, now: I) -> Vec<Broadcast> {
        let rules = self.config.dismantle;
        self.registry
            .iter_mut()
            .filter_map(|record| {
                record.decay(now, &rules).then(|| Broadcast::DismantleProgress {
                    drop_id: record.drop_id(),
                    revision: record.revision(),
                    progress: 0.0,
                })
            })
            .collect()
    }

    /// Discard every drop without grants or broadcasts.
    ///
    /// Returns how many were discarded. `DROP` replay state is kept, so a
    /// request redelivered after cleanup still cannot recreate its item.
    pub fn cleanup(&mut self) -> usize {
        self.registry.clear()
    }

    fn pickup(
        &mut self,
        drop_id: DropId,
        requester: PlayerId,
        now: I,
        inventory: &mut impl Inventory,
    ) -> Result<Vec<Broadcast>, Rejection> {
        let record = self.registry.get(drop_id).ok_or(Rejection::UnknownDrop { drop_id })?;

        if !record.can_pick_up(requester) {
            return Err(Rejection::NotOwner { drop_id, requester, owner: record.owner() });
        }

        let age = elapsed(record.spawn_time(), now);
        if age < self.config.pickup_delay {
            return Err(Rejection::PickupTooEarly {
                drop_id,
                remaining: self.config.pickup_delay - age,
            });
        }

        if !inventory.add_item(requester, record.item()) {
            return Err(Rejection::InventoryFull { drop_id, requester });
        }

        self.registry.remove(drop_id);
        Ok(vec![Broadcast::ItemPickedUp { drop_id, requester }])
    }

    fn share(&mut self, drop_id: DropId, requester: PlayerId) -> Result<Vec<Broadcast>, Rejection> {
        let record = self.registry.get_mut(drop_id).ok_or(Rejection::UnknownDrop { drop_id })?;

        if record.is_shared() {
            return Err(Rejection::AlreadyShared { drop_id });
        }
        if requester != record.owner() {
            return Err(Rejection::NotOwner { drop_id, requester, owner: record.owner() });
        }
        let kind = record.item().kind;
        if !kind.can_share() {
            return Err(Rejection::NotShareable { drop_id, kind });
        }

        record.mark_shared();
        Ok(vec![Broadcast::ItemShared { drop_id, revision: record.revision() }])
    }

    fn tap(
        &mut self,
        drop_id: DropId,
        requester: PlayerId,
        strength: f32,
        now: I,
        inventory: &mut impl Inventory,
    ) -> Result<Vec<Broadcast>, Rejection> {
        let rules = self.config.dismantle;
        let max_strength = self.config.max_tap_strength;
        let record = self.registry.get_mut(drop_id).ok_or(Rejection::UnknownDrop { drop_id })?;

        let kind = record.item().kind;
        if !kind.can_dismantle() {
            return Err(Rejection::NotDismantlable { drop_id, kind });
        }
        if !strength.is_finite() || strength <= 0.0 {
            return Err(Rejection::InvalidStrength { drop_id, strength });
        }

        match record.tap(strength.min(max_strength), now, &rules) {
            TapOutcome::TooSoon => Err(Rejection::TapTooSoon { drop_id }),
            TapOutcome::Advanced { progress } => Ok(vec![Broadcast::DismantleProgress {
                drop_id,
                revision: record.revision(),
                progress,
            }]),
            TapOutcome::Completed | TapOutcome::AlreadyComplete => {
                let mut broadcasts = vec![Broadcast::DismantleProgress {
                    drop_id,
                    revision: record.revision(),
                    progress: 1.0,
                }];
                broadcasts.extend(self.complete_dismantle(drop_id, requester, inventory));
                Ok(broadcasts)
            },
        }
    }

    fn instant_dismantle(
        &mut self,
        drop_id: DropId,
        requester: PlayerId,
        inventory: &mut impl Inventory,
    ) -> Result<Vec<Broadcast>, Rejection> {
        let record = self.registry.get_mut(drop_id).ok_or(Rejection::UnknownDrop { drop_id })?;

        let kind = record.item().kind;
        if !kind.can_dismantle() {
            return Err(Rejection::NotDismantlable { drop_id, kind });
        }

        record.complete_dismantle();
        Ok(self.complete_dismantle(drop_id, requester, inventory).into_iter().collect())
    }

    /// Pay out and remove a fully dismantled drop.
    fn complete_dismantle(
        &mut self,
        drop_id: DropId,
        requester: PlayerId,
        inventory: &mut impl Inventory,
    ) -> Option<Broadcast> {
        let record = self.registry.remove(drop_id)?;
        let reward = dismantle_reward(record.item());
        inventory.grant_currency(requester, reward);
        Some(Broadcast::ItemDismantled { drop_id, reward })
    }
}

fn check_position(position: Position) -> Result<(), Rejection> {
    if position.is_finite() { Ok(()) } else { Err(Rejection::InvalidPosition { position }) }
}
