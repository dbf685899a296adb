//! Dismantle rewards.

use lootsync_proto::{ItemSnapshot, Rarity};

/// Currency paid for dismantling a bonus-free item of `rarity`.
pub const fn base_reward(rarity: Rarity) -> u64 {
    match rarity {
        Rarity::Common => 5,
        Rarity::Uncommon => 12,
        Rarity::Rare => 30,
        Rarity::Epic => 75,
        Rarity::Legendary => 200,
    }
}

/// Currency paid for dismantling `item`.
///
/// Each rolled bonus adds a fifth of the rarity's base. Pure function of the
/// snapshot, so host and clients always agree on the amount.
pub fn dismantle_reward(item: &ItemSnapshot) -> u64 {
    let base = base_reward(item.rarity);
    let bonuses = item.bonuses.len() as u64;
    base.saturating_add(bonuses.saturating_mul(base) / 5)
}

#[cfg(test)]
mod tests {
    use lootsync_proto::ItemKind;

    use super::*;

    #[test]
    fn reward_grows_with_rarity() {
        let rewards: Vec<u64> = Rarity::ALL
            .iter()
            .map(|&r| dismantle_reward(&ItemSnapshot::new(1, ItemKind::Equipment, r)))
            .collect();
        assert!(rewards.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bonuses_add_a_fifth_of_base() {
        let item = ItemSnapshot::new(1, ItemKind::Equipment, Rarity::Rare)
            .with_bonus(1, 10)
            .with_bonus(2, -3);
        assert_eq!(dismantle_reward(&item), 30 + 12);
    }

    #[test]
    fn upgrade_level_does_not_change_reward() {
        let plain = ItemSnapshot::new(1, ItemKind::Equipment, Rarity::Epic);
        let upgraded = plain.clone().with_upgrade_level(9);
        assert_eq!(dismantle_reward(&plain), dismantle_reward(&upgraded));
    }
}
