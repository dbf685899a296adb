//! Projector convergence under duplicated and reordered delivery.

use lootsync_client::{ClientProjector, DropNotification, MirrorRecord};
use lootsync_proto::{
    Broadcast, DropSnapshot, ItemKind, ItemSnapshot, PlayerId, Position, Rarity,
};
use proptest::prelude::*;

const ME: PlayerId = 1;

/// Host order for two drops: one dismantled, one still live.
fn host_history() -> Vec<Broadcast> {
    let snapshot = |drop_id| {
        Broadcast::DropCreated(DropSnapshot {
            drop_id,
            revision: 0,
            owner: ME,
            shared: false,
            monster: false,
            progress: 0.0,
            position: Position::new(2.0, 0.0, -1.0),
            item: ItemSnapshot::new(77, ItemKind::Equipment, Rarity::Uncommon).with_bonus(1, 4),
        })
    };

    vec![
        snapshot(1),
        snapshot(2),
        Broadcast::ItemShared { drop_id: 1, revision: 1 },
        Broadcast::DismantleProgress { drop_id: 1, revision: 2, progress: 0.3 },
        Broadcast::DismantleProgress { drop_id: 2, revision: 1, progress: 0.5 },
        Broadcast::DismantleProgress { drop_id: 1, revision: 3, progress: 0.6 },
        Broadcast::DismantleProgress { drop_id: 2, revision: 2, progress: 1.0 },
        Broadcast::ItemDismantled { drop_id: 2, reward: 14 },
        Broadcast::DismantleProgress { drop_id: 1, revision: 4, progress: 0.0 },
    ]
}

fn mirror(projector: &ClientProjector) -> Vec<MirrorRecord> {
    projector.iter().cloned().collect()
}

fn delivery() -> impl Strategy<Value = Vec<Broadcast>> {
    let history = host_history();
    let n = history.len();
    (Just(history).prop_shuffle(), prop::collection::vec(0..n, 0..10)).prop_map(
        |(mut shuffled, extra)| {
            let dups: Vec<Broadcast> = extra.iter().map(|&i| shuffled[i].clone()).collect();
            for (offset, dup) in dups.into_iter().enumerate() {
                let at = (offset * 3) % (shuffled.len() + 1);
                shuffled.insert(at, dup);
            }
            shuffled
        },
    )
}

#[test]
fn in_order_history_matches_expected_mirror() {
    let mut projector = ClientProjector::new(ME);
    for broadcast in host_history() {
        projector.apply(&broadcast);
    }

    let live = mirror(&projector);
    assert_eq!(live.len(), 1);
    assert!(live[0].shared);
    assert_eq!(live[0].progress, 0.0);
    assert_eq!(live[0].revision, 4);
    assert!(projector.is_removed(2));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_any_delivery_order_converges(delivered in delivery()) {
        let mut expected = ClientProjector::new(ME);
        for broadcast in host_history() {
            expected.apply(&broadcast);
        }

        let mut actual = ClientProjector::new(ME);
        let mut dismantled = 0;
        for broadcast in &delivered {
            dismantled += actual
                .apply(broadcast)
                .iter()
                .filter(|n| matches!(n, DropNotification::ItemDismantled { .. }))
                .count();
        }

        // PROPERTY: the mirror depends only on what was delivered, not the order
        prop_assert_eq!(mirror(&actual), mirror(&expected));
        prop_assert_eq!(actual.deferred_len(), 0);

        // PROPERTY: terminal callbacks fire once however often they arrive
        prop_assert_eq!(dismantled, 1);
    }

    #[test]
    fn prop_replaying_everything_changes_nothing(delivered in delivery()) {
        let mut projector = ClientProjector::new(ME);
        for broadcast in &delivered {
            projector.apply(broadcast);
        }
        let before = mirror(&projector);

        let mut notified = 0;
        for broadcast in &delivered {
            notified += projector.apply(broadcast).len();
        }

        // PROPERTY: a second full delivery is a no-op
        prop_assert_eq!(notified, 0);
        prop_assert_eq!(mirror(&projector), before);
    }
}
