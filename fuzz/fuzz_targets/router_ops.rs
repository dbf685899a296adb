//! Fuzz target for the request router
//!
//! Applies arbitrary request sequences, with arbitrary time steps, to a
//! router holding a few drops.
//!
//! # Invariants
//!
//! - A drop is granted at most once, as an item or as currency
//! - Every grant is announced by exactly one terminal broadcast
//! - Progress stays within [0, 1]

#![no_main]

use std::{collections::HashMap, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lootsync_host::{HostConfig, Inventory, NewDrop, RequestRouter};
use lootsync_proto::{
    Broadcast, DropId, ItemKind, ItemSnapshot, PlayerId, Position, Rarity, Request,
};

#[derive(Debug, Clone, Arbitrary)]
enum RouterOp {
    Pickup { drop: u8, requester: u8 },
    Share { drop: u8, requester: u8 },
    Tap { drop: u8, requester: u8, strength: f32 },
    Instant { drop: u8, requester: u8 },
    Drop { requester: u8, session: u8, seq: u8 },
    Advance { millis: u16 },
    Decay,
}

/// Counts grants per drop, attributed to the target of the request being
/// routed.
#[derive(Default)]
struct TallyInventory {
    target: DropId,
    grants: HashMap<DropId, u32>,
}

impl Inventory for TallyInventory {
    fn add_item(&mut self, _: PlayerId, _: &ItemSnapshot) -> bool {
        *self.grants.entry(self.target).or_default() += 1;
        true
    }

    fn grant_currency(&mut self, _: PlayerId, _: u64) {
        *self.grants.entry(self.target).or_default() += 1;
    }
}

fuzz_target!(|ops: Vec<RouterOp>| {
    let mut router = RequestRouter::<Duration>::new(HostConfig::default());
    let mut inventory = TallyInventory::default();
    let mut now = Duration::ZERO;
    let mut terminals: HashMap<DropId, u32> = HashMap::new();

    let sword = ItemSnapshot::new(1, ItemKind::Equipment, Rarity::Rare).with_bonus(1, 1);
    let herb = ItemSnapshot::new(2, ItemKind::Material, Rarity::Common).with_stack(4);
    for drop in [
        NewDrop::player(1, sword.clone(), Position::ORIGIN),
        NewDrop::monster_loot(sword.clone(), Position::ORIGIN),
        NewDrop::monster_loot(herb, Position::ORIGIN),
    ] {
        assert!(router.create_drop(drop, now).is_ok());
    }

    for op in ops {
        let drop_id = |drop: u8| DropId::from(drop % 5);
        let request = match op {
            RouterOp::Pickup { drop, requester } => {
                Request::Pickup { drop_id: drop_id(drop), requester: requester.into() }
            },
            RouterOp::Share { drop, requester } => {
                Request::Share { drop_id: drop_id(drop), requester: requester.into() }
            },
            RouterOp::Tap { drop, requester, strength } => Request::DismantleTap {
                drop_id: drop_id(drop),
                requester: requester.into(),
                strength,
            },
            RouterOp::Instant { drop, requester } => {
                Request::InstantDismantle { drop_id: drop_id(drop), requester: requester.into() }
            },
            RouterOp::Drop { requester, session, seq } => Request::Drop {
                requester: requester.into(),
                session: session.into(),
                seq: seq.into(),
                item: sword.clone(),
                position: Position::ORIGIN,
            },
            RouterOp::Advance { millis } => {
                now += Duration::from_millis(millis.into());
                continue;
            },
            RouterOp::Decay => {
                for broadcast in router.decay(now) {
                    assert!(matches!(
                        broadcast,
                        Broadcast::DismantleProgress { progress, .. } if progress == 0.0
                    ));
                }
                continue;
            },
        };

        inventory.target = request.drop_id().unwrap_or_default();
        if let Ok(broadcasts) = router.route(request, now, &mut inventory) {
            for broadcast in broadcasts {
                match broadcast {
                    Broadcast::ItemPickedUp { drop_id, .. }
                    | Broadcast::ItemDismantled { drop_id, .. } => {
                        *terminals.entry(drop_id).or_default() += 1;
                    },
                    Broadcast::DismantleProgress { progress, .. } => {
                        assert!((0.0..=1.0).contains(&progress), "progress {progress}");
                    },
                    Broadcast::DropCreated(_) | Broadcast::ItemShared { .. } => {},
                }
            }
        }
    }

    for (drop_id, count) in &inventory.grants {
        assert_eq!(*count, 1, "drop {drop_id} granted {count} times");
        assert_eq!(terminals.get(drop_id), Some(&1), "grant for drop {drop_id} not announced");
    }
    assert!(terminals.values().all(|&count| count == 1));
});
