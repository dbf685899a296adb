//! Inventory collaborator.
//!
//! The host grants items and currency through this trait only. The game's
//! real inventory implements it; [`MemoryInventory`] is a ledger for the
//! binary and for tests.

use std::collections::BTreeMap;

use lootsync_proto::{ItemSnapshot, PlayerId};

/// Host-side player inventories.
pub trait Inventory {
    /// Add `item` to `player`'s inventory. `false` if it doesn't fit.
    fn add_item(&mut self, player: PlayerId, item: &ItemSnapshot) -> bool;

    /// Credit `amount` currency to `player`.
    fn grant_currency(&mut self, player: PlayerId, amount: u64);
}

/// In-memory inventory ledger with an optional per-player slot limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryInventory {
    items: BTreeMap<PlayerId, Vec<ItemSnapshot>>,
    currency: BTreeMap<PlayerId, u64>,
    capacity: Option<usize>,
}

impl MemoryInventory {
    /// Unlimited inventories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inventories holding at most `slots` items per player.
    pub fn with_capacity(slots: usize) -> Self {
        Self { capacity: Some(slots), ..Self::default() }
    }

    /// Items held by `player`, in grant order.
    pub fn items(&self, player: PlayerId) -> &[ItemSnapshot] {
        self.items.get(&player).map_or(&[], Vec::as_slice)
    }

    /// Currency held by `player`.
    pub fn currency(&self, player: PlayerId) -> u64 {
        self.currency.get(&player).copied().unwrap_or(0)
    }

    /// Items granted across all players.
    pub fn total_items(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// Currency granted across all players.
    pub fn total_currency(&self) -> u64 {
        self.currency.values().sum()
    }
}

impl Inventory for MemoryInventory {
    fn add_item(&mut self, player: PlayerId, item: &ItemSnapshot) -> bool {
        let slots = self.items.entry(player).or_default();
        if self.capacity.is_some_and(|cap| slots.len() >= cap) {
            return false;
        }
        slots.push(item.clone());
        true
    }

    fn grant_currency(&mut self, player: PlayerId, amount: u64) {
        let balance = self.currency.entry(player).or_default();
        *balance = balance.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use lootsync_proto::{ItemKind, Rarity};

    use super::*;

    #[test]
    fn capacity_is_per_player() {
        let mut inv = MemoryInventory::with_capacity(1);
        let item = ItemSnapshot::new(1, ItemKind::Material, Rarity::Common);

        assert!(inv.add_item(1, &item));
        assert!(!inv.add_item(1, &item));
        assert!(inv.add_item(2, &item));
        assert_eq!(inv.total_items(), 2);
    }

    #[test]
    fn currency_accumulates() {
        let mut inv = MemoryInventory::new();
        inv.grant_currency(3, 10);
        inv.grant_currency(3, 5);
        assert_eq!(inv.currency(3), 15);
        assert_eq!(inv.currency(4), 0);
        assert_eq!(inv.total_currency(), 15);
    }
}
