//! Authoritative table of active drops.
//!
//! Keyed by [`DropId`]. Presentation code holds only ids and looks records up
//! on demand; nothing outside the registry keeps a reference into it. Ids are
//! allocated from a counter that never goes backwards, so a removed id is
//! never handed out again.

use std::{collections::BTreeMap, ops::Sub, time::Duration};

use lootsync_core::{DismantleAccumulator, DismantleRules, DropState, TapOutcome};
use lootsync_proto::{DropId, DropSnapshot, ItemSnapshot, PlayerId, Position};

/// One active drop.
///
/// Fields that must not change after creation (owner, item, monster flag) are
/// only readable. `shared` can only go from false to true.
#[derive(Debug, Clone)]
pub struct DropRecord<I> {
    drop_id: DropId,
    item: ItemSnapshot,
    position: Position,
    owner: PlayerId,
    shared: bool,
    monster: bool,
    dismantle: DismantleAccumulator<I>,
    spawn_time: I,
    revision: u64,
}

impl<I> DropRecord<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Drop id.
    pub fn drop_id(&self) -> DropId {
        self.drop_id
    }

    /// The dropped item.
    pub fn item(&self) -> &ItemSnapshot {
        &self.item
    }

    /// Where it was dropped.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Player who caused the drop.
    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Whether anyone may pick it up.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Whether it is monster loot.
    pub fn is_monster(&self) -> bool {
        self.monster
    }

    /// Dismantle progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.dismantle.progress()
    }

    /// Creation time.
    pub fn spawn_time(&self) -> I {
        self.spawn_time
    }

    /// Number of mutations since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Lifecycle state.
    pub fn state(&self) -> DropState {
        DropState::live(self.shared, self.dismantle.progress())
    }

    /// Whether `player` may pick this drop up.
    pub fn can_pick_up(&self, player: PlayerId) -> bool {
        self.shared || player == self.owner
    }

    /// Open the drop to everyone. Returns `false` if it already was.
    pub(crate) fn mark_shared(&mut self) -> bool {
        if self.shared {
            return false;
        }
        self.shared = true;
        self.revision += 1;
        true
    }

    pub(crate) fn tap(&mut self, strength: f32, now: I, rules: &DismantleRules) -> TapOutcome {
        let outcome = self.dismantle.tap(strength, now, rules);
        if matches!(outcome, TapOutcome::Advanced { .. } | TapOutcome::Completed) {
            self.revision += 1;
        }
        outcome
    }

    pub(crate) fn decay(&mut self, now: I, rules: &DismantleRules) -> bool {
        let reset = self.dismantle.decay(now, rules);
        if reset {
            self.revision += 1;
        }
        reset
    }

    pub(crate) fn complete_dismantle(&mut self) {
        self.dismantle.complete();
    }

    /// Full state for a `CREATED` broadcast.
    pub fn snapshot(&self) -> DropSnapshot {
        DropSnapshot {
            drop_id: self.drop_id,
            revision: self.revision,
            owner: self.owner,
            shared: self.shared,
            monster: self.monster,
            progress: self.dismantle.progress(),
            position: self.position,
            item: self.item.clone(),
        }
    }
}

/// Parameters for a new drop.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrop {
    /// Item being dropped.
    pub item: ItemSnapshot,
    /// Where it lands.
    pub position: Position,
    /// Player who caused it, or [`lootsync_proto::NO_OWNER`].
    pub owner: PlayerId,
    /// Whether anyone may pick it up from the start.
    pub shared: bool,
    /// Whether it is monster loot.
    pub monster: bool,
}

impl NewDrop {
    /// Unshared drop caused by `owner`.
    pub fn player(owner: PlayerId, item: ItemSnapshot, position: Position) -> Self {
        Self { item, position, owner, shared: false, monster: false }
    }

    /// Ownerless, shared monster loot.
    pub fn monster_loot(item: ItemSnapshot, position: Position) -> Self {
        Self { item, position, owner: lootsync_proto::NO_OWNER, shared: true, monster: true }
    }
}

/// All active drops.
#[derive(Debug, Clone)]
pub struct DropRegistry<I> {
    records: BTreeMap<DropId, DropRecord<I>>,
    next_id: DropId,
}

impl<I> Default for DropRegistry<I> {
    fn default() -> Self {
        Self { records: BTreeMap::new(), next_id: 1 }
    }
}

impl<I> DropRegistry<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Empty registry. The first drop gets id 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new drop and return its id. Always succeeds.
    pub fn create(&mut self, drop: NewDrop, now: I) -> DropId {
        self.insert(drop, now).drop_id
    }

    pub(crate) fn insert(&mut self, drop: NewDrop, now: I) -> &DropRecord<I> {
        let drop_id = self.next_id;
        self.next_id += 1;

        let NewDrop { item, position, owner, shared, monster } = drop;
        self.records.entry(drop_id).or_insert(DropRecord {
            drop_id,
            item,
            position,
            owner,
            shared,
            monster,
            dismantle: DismantleAccumulator::new(),
            spawn_time: now,
            revision: 0,
        })
    }

    /// Look up a drop.
    pub fn get(&self, drop_id: DropId) -> Option<&DropRecord<I>> {
        self.records.get(&drop_id)
    }

    pub(crate) fn get_mut(&mut self, drop_id: DropId) -> Option<&mut DropRecord<I>> {
        self.records.get_mut(&drop_id)
    }

    /// Remove a drop. Absent ids are a no-op.
    pub fn remove(&mut self, drop_id: DropId) -> Option<DropRecord<I>> {
        self.records.remove(&drop_id)
    }

    /// Remove every drop. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Active drops in id order.
    pub fn iter(&self) -> impl Iterator<Item = &DropRecord<I>> {
        self.records.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DropRecord<I>> {
        self.records.values_mut()
    }

    /// Number of active drops.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no drops are active.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Id the next drop will get.
    pub fn next_id(&self) -> DropId {
        self.next_id
    }
}
