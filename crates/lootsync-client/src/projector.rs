//! Read-only mirror of host drop state.
//!
//! Each client keeps one [`MirrorRecord`] per live drop, built only from host
//! broadcasts. Records are never edited in place: every accepted broadcast
//! produces a new record that replaces the old one.
//!
//! The channel may duplicate and reorder, so every update is idempotent:
//!
//! - `CREATED` for a drop already mirrored is a duplicate.
//! - `SHARED` only ever sets the flag (it never reverts).
//! - `PROGRESS` applies only if its revision is newer than the last applied
//!   progress.
//! - Terminal broadcasts leave a tombstone; anything later for that drop,
//!   including a late `CREATED`, is ignored.
//! - Tombstones are capped at [`MAX_TOMBSTONES`]. Past that the lowest ids
//!   fold into a watermark: host ids only grow, so an unmirrored id at or
//!   below the watermark is treated as removed.
//! - Deltas for a drop not yet created are held until its `CREATED` arrives.

use std::collections::BTreeMap;

use lootsync_core::DropState;
use lootsync_proto::{Broadcast, DropId, DropSnapshot, ItemSnapshot, PlayerId, Position};

use crate::event::DropNotification;

/// Most deltas held for drops whose `CREATED` hasn't arrived.
pub const MAX_DEFERRED: usize = 256;

/// Most terminal states remembered individually.
pub const MAX_TOMBSTONES: usize = 1024;

/// Client view of one live drop.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRecord {
    /// Drop id.
    pub drop_id: DropId,
    /// Highest host revision seen for this drop.
    pub revision: u64,
    /// Revision the current `progress` came from.
    pub progress_revision: u64,
    /// Player who caused the drop.
    pub owner: PlayerId,
    /// Whether anyone may pick it up.
    pub shared: bool,
    /// Whether it is monster loot.
    pub monster: bool,
    /// Host-confirmed dismantle progress.
    pub progress: f32,
    /// Where it is.
    pub position: Position,
    /// The item.
    pub item: ItemSnapshot,
}

impl MirrorRecord {
    fn from_snapshot(snapshot: &DropSnapshot) -> Self {
        Self {
            drop_id: snapshot.drop_id,
            revision: snapshot.revision,
            progress_revision: snapshot.revision,
            owner: snapshot.owner,
            shared: snapshot.shared,
            monster: snapshot.monster,
            progress: snapshot.progress,
            position: snapshot.position,
            item: snapshot.item.clone(),
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> DropState {
        DropState::live(self.shared, self.progress)
    }

    /// Whether the host would let `player` pick this up (pickup delay aside).
    pub fn can_pick_up(&self, player: PlayerId) -> bool {
        self.shared || self.owner == player
    }
}

/// Per-client mirror of the host registry.
#[derive(Debug, Clone)]
pub struct ClientProjector {
    local_player: PlayerId,
    mirror: BTreeMap<DropId, MirrorRecord>,
    tombstones: BTreeMap<DropId, DropState>,
    /// Highest id folded out of `tombstones`, 0 if none.
    watermark: DropId,
    deferred: Vec<Broadcast>,
}

impl ClientProjector {
    /// Empty mirror for `local_player`.
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            local_player,
            mirror: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            watermark: 0,
            deferred: Vec::new(),
        }
    }

    /// Apply one broadcast.
    ///
    /// Returns the notifications it caused: usually one, none for duplicates
    /// and stale deltas, and more than one when a `CREATED` releases deferred
    /// deltas.
    pub fn apply(&mut self, broadcast: &Broadcast) -> Vec<DropNotification> {
        let drop_id = broadcast.drop_id();

        if self.is_removed(drop_id) {
            tracing::debug!(
                drop_id,
                state = ?self.tombstones.get(&drop_id),
                opcode = broadcast.opcode().as_str(),
                "ignoring broadcast for removed drop"
            );
            return Vec::new();
        }

        match broadcast {
            Broadcast::DropCreated(snapshot) => self.apply_created(snapshot),
            Broadcast::ItemPickedUp { drop_id, requester } => {
                self.remove(*drop_id, DropState::PickedUp);
                vec![DropNotification::ItemPickedUp {
                    drop_id: *drop_id,
                    picked_up_by: *requester,
                    by_local_player: *requester == self.local_player,
                }]
            },
            Broadcast::ItemDismantled { drop_id, reward } => {
                self.remove(*drop_id, DropState::Dismantled);
                vec![DropNotification::ItemDismantled { drop_id: *drop_id, reward: *reward }]
            },
            Broadcast::ItemShared { .. } | Broadcast::DismantleProgress { .. } => {
                self.apply_delta(broadcast).into_iter().collect()
            },
        }
    }

    /// Mirror of a live drop.
    pub fn get(&self, drop_id: DropId) -> Option<&MirrorRecord> {
        self.mirror.get(&drop_id)
    }

    /// Lifecycle state of a drop this client has heard of.
    ///
    /// `None` for drops folded into the tombstone watermark.
    pub fn state(&self, drop_id: DropId) -> Option<DropState> {
        self.mirror
            .get(&drop_id)
            .map(MirrorRecord::state)
            .or_else(|| self.tombstones.get(&drop_id).copied())
    }

    /// Whether the drop is known to be gone.
    pub fn is_removed(&self, drop_id: DropId) -> bool {
        self.tombstones.contains_key(&drop_id)
            || (drop_id <= self.watermark && !self.mirror.contains_key(&drop_id))
    }

    /// Terminal states remembered individually.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Live drops in id order.
    pub fn iter(&self) -> impl Iterator<Item = &MirrorRecord> {
        self.mirror.values()
    }

    /// Number of live drops.
    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    /// Whether no drops are live.
    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Deltas waiting for their `CREATED`.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Forget everything, tombstones included.
    pub fn clear(&mut self) {
        self.mirror.clear();
        self.tombstones.clear();
        self.watermark = 0;
        self.deferred.clear();
    }

    fn apply_created(&mut self, snapshot: &DropSnapshot) -> Vec<DropNotification> {
        let drop_id = snapshot.drop_id;
        if self.mirror.contains_key(&drop_id) {
            return Vec::new();
        }

        self.mirror.insert(drop_id, MirrorRecord::from_snapshot(snapshot));
        let mut notifications = vec![DropNotification::ItemDropped {
            drop_id,
            item: snapshot.item.clone(),
            position: snapshot.position,
        }];

        let (ready, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.deferred).into_iter().partition(|b| b.drop_id() == drop_id);
        self.deferred = waiting;
        for delta in &ready {
            notifications.extend(self.apply_delta(delta));
        }

        notifications
    }

    fn apply_delta(&mut self, delta: &Broadcast) -> Option<DropNotification> {
        let drop_id = delta.drop_id();
        let Some(current) = self.mirror.get(&drop_id) else {
            self.defer(delta);
            return None;
        };

        let mut next = current.clone();
        let notification = match *delta {
            Broadcast::ItemShared { revision, .. } => {
                next.revision = next.revision.max(revision);
                (!current.shared).then(|| {
                    next.shared = true;
                    DropNotification::ItemShared { drop_id }
                })
            },
            Broadcast::DismantleProgress { revision, progress, .. } => {
                next.revision = next.revision.max(revision);
                (revision > current.progress_revision).then(|| {
                    next.progress = progress;
                    next.progress_revision = revision;
                    DropNotification::DismantleProgress { drop_id, progress, optimistic: false }
                })
            },
            Broadcast::DropCreated(_)
            | Broadcast::ItemPickedUp { .. }
            | Broadcast::ItemDismantled { .. } => None,
        };

        if next != *current {
            self.mirror.insert(drop_id, next);
        }
        notification
    }

    fn defer(&mut self, delta: &Broadcast) {
        if self.deferred.len() >= MAX_DEFERRED {
            tracing::warn!(
                drop_id = delta.drop_id(),
                "deferred buffer full, discarding early broadcast"
            );
            return;
        }
        self.deferred.push(delta.clone());
    }

    fn remove(&mut self, drop_id: DropId, terminal: DropState) {
        self.mirror.remove(&drop_id);
        self.tombstones.insert(drop_id, terminal);
        self.deferred.retain(|b| b.drop_id() != drop_id);

        while self.tombstones.len() > MAX_TOMBSTONES {
            let Some((folded, _)) = self.tombstones.pop_first() else { break };
            self.watermark = self.watermark.max(folded);
        }
    }
}

#[cfg(test)]
mod tests {
    use lootsync_proto::{ItemKind, Rarity};

    use super::*;

    const ME: PlayerId = 7;

    fn created(drop_id: DropId) -> Broadcast {
        Broadcast::DropCreated(DropSnapshot {
            drop_id,
            revision: 0,
            owner: ME,
            shared: false,
            monster: false,
            progress: 0.0,
            position: Position::new(1.0, 0.0, 1.0),
            item: ItemSnapshot::new(3, ItemKind::Equipment, Rarity::Rare),
        })
    }

    #[test]
    fn created_notifies_once() {
        let mut p = ClientProjector::new(ME);
        assert_eq!(p.apply(&created(1)).len(), 1);
        assert!(p.apply(&created(1)).is_empty());
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn duplicate_pickup_is_idempotent() {
        let mut p = ClientProjector::new(ME);
        p.apply(&created(1));

        let picked = Broadcast::ItemPickedUp { drop_id: 1, requester: ME };
        let first = p.apply(&picked);
        assert_eq!(
            first,
            vec![DropNotification::ItemPickedUp {
                drop_id: 1,
                picked_up_by: ME,
                by_local_player: true
            }]
        );

        let mirror_after_first: Vec<MirrorRecord> = p.iter().cloned().collect();
        assert!(p.apply(&picked).is_empty());
        assert_eq!(p.iter().cloned().collect::<Vec<_>>(), mirror_after_first);
        assert_eq!(p.state(1), Some(DropState::PickedUp));
    }

    #[test]
    fn late_created_after_terminal_is_ignored() {
        let mut p = ClientProjector::new(ME);
        p.apply(&Broadcast::ItemDismantled { drop_id: 4, reward: 30 });
        assert!(p.apply(&created(4)).is_empty());
        assert!(p.get(4).is_none());
        assert!(p.is_removed(4));
    }

    #[test]
    fn stale_progress_is_ignored() {
        let mut p = ClientProjector::new(ME);
        p.apply(&created(1));
        p.apply(&Broadcast::DismantleProgress { drop_id: 1, revision: 2, progress: 0.8 });
        let stale =
            p.apply(&Broadcast::DismantleProgress { drop_id: 1, revision: 1, progress: 0.4 });

        assert!(stale.is_empty());
        assert_eq!(p.get(1).map(|r| r.progress), Some(0.8));
    }

    #[test]
    fn share_survives_reordering_with_progress() {
        let mut p = ClientProjector::new(ME);
        p.apply(&created(1));
        // Host order: PROGRESS r1, SHARED r2. Delivered reversed.
        p.apply(&Broadcast::ItemShared { drop_id: 1, revision: 2 });
        p.apply(&Broadcast::DismantleProgress { drop_id: 1, revision: 1, progress: 0.4 });

        let record = p.get(1).unwrap();
        assert!(record.shared);
        assert_eq!(record.progress, 0.4);
        assert_eq!(record.revision, 2);
    }

    #[test]
    fn early_deltas_replay_after_created() {
        let mut p = ClientProjector::new(ME);
        assert!(p.apply(&Broadcast::ItemShared { drop_id: 9, revision: 1 }).is_empty());
        assert_eq!(p.deferred_len(), 1);

        let notifications = p.apply(&created(9));
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[1], DropNotification::ItemShared { drop_id: 9 });
        assert_eq!(p.deferred_len(), 0);
        assert_eq!(p.state(9), Some(DropState::Shared));
    }

    #[test]
    fn terminal_discards_deferred_deltas() {
        let mut p = ClientProjector::new(ME);
        p.apply(&Broadcast::DismantleProgress { drop_id: 2, revision: 1, progress: 0.5 });
        p.apply(&Broadcast::ItemDismantled { drop_id: 2, reward: 5 });
        assert_eq!(p.deferred_len(), 0);
    }

    #[test]
    fn deferred_buffer_is_bounded() {
        let mut p = ClientProjector::new(ME);
        for drop_id in 0..(MAX_DEFERRED as u64 + 10) {
            p.apply(&Broadcast::ItemShared { drop_id: drop_id + 100, revision: 1 });
        }
        assert_eq!(p.deferred_len(), MAX_DEFERRED);
    }

    #[test]
    fn tombstones_stay_bounded() {
        let mut p = ClientProjector::new(ME);
        let total = MAX_TOMBSTONES as u64 * 3;
        for drop_id in 1..=total {
            p.apply(&created(drop_id));
            p.apply(&Broadcast::ItemPickedUp { drop_id, requester: ME });
        }

        assert_eq!(p.tombstone_count(), MAX_TOMBSTONES);
        assert!(p.is_empty());

        // Oldest drops are folded, newest still individual; both stay dead.
        for drop_id in [1, total] {
            assert!(p.is_removed(drop_id));
            assert!(p.apply(&created(drop_id)).is_empty());
            assert!(p.get(drop_id).is_none());
        }
        assert_eq!(p.state(1), None);
        assert_eq!(p.state(total), Some(DropState::PickedUp));
    }

    #[test]
    fn live_drop_below_watermark_stays_live() {
        let mut p = ClientProjector::new(ME);
        p.apply(&created(1));
        for drop_id in 2..=(MAX_TOMBSTONES as u64 + 10) {
            p.apply(&Broadcast::ItemDismantled { drop_id, reward: 1 });
        }

        assert!(!p.is_removed(1));
        let shared = p.apply(&Broadcast::ItemShared { drop_id: 1, revision: 1 });
        assert_eq!(shared, vec![DropNotification::ItemShared { drop_id: 1 }]);
    }

    #[test]
    fn pickup_by_someone_else() {
        let mut p = ClientProjector::new(ME);
        p.apply(&created(1));
        let n = p.apply(&Broadcast::ItemPickedUp { drop_id: 1, requester: 99 });
        assert_eq!(
            n,
            vec![DropNotification::ItemPickedUp {
                drop_id: 1,
                picked_up_by: 99,
                by_local_player: false
            }]
        );
    }
}
