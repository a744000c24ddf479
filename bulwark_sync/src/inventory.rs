// Tower inventory: how many of each tower a player owns and how many are
// currently reserved.
//
// A slot is reserved when a placement is attempted, before the host has
// confirmed it, so a follower cannot overspend while requests are in
// flight. It is released when the tower is removed, when the host refuses
// the placement, or when the whole game state is reset.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stock {
    pub owned: u32,
    pub used: u32,
}

impl Stock {
    pub fn available(self) -> u32 {
        self.owned.saturating_sub(self.used)
    }
}

/// Stock per tower stats index.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    stock: BTreeMap<u32, Stock>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stats_index: u32, quantity: u32) {
        let stock = self.stock.entry(stats_index).or_default();
        stock.owned = stock.owned.saturating_add(quantity);
    }

    /// Reserve `quantity` towers. Fails without side effects if fewer are
    /// available.
    pub fn start_using(&mut self, stats_index: u32, quantity: u32) -> bool {
        let Some(stock) = self.stock.get_mut(&stats_index) else {
            return false;
        };
        if stock.available() < quantity {
            return false;
        }
        stock.used += quantity;
        true
    }

    /// Release `quantity` reservations, never going below zero.
    pub fn stop_using(&mut self, stats_index: u32, quantity: u32) {
        if let Some(stock) = self.stock.get_mut(&stats_index) {
            stock.used = stock.used.saturating_sub(quantity);
        }
    }

    /// Release every reservation; ownership is kept.
    pub fn release_all(&mut self) {
        for stock in self.stock.values_mut() {
            stock.used = 0;
        }
    }

    pub fn stock(&self, stats_index: u32) -> Stock {
        self.stock.get(&stats_index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_until_exhausted() {
        let mut inv = Inventory::new();
        inv.add(2, 2);
        assert!(inv.start_using(2, 1));
        assert!(inv.start_using(2, 1));
        assert!(!inv.start_using(2, 1));
        assert_eq!(inv.stock(2), Stock { owned: 2, used: 2 });
    }

    #[test]
    fn unknown_tower_cannot_be_reserved() {
        let mut inv = Inventory::new();
        assert!(!inv.start_using(7, 1));
        assert_eq!(inv.stock(7), Stock::default());
    }

    #[test]
    fn release_clamps_at_zero() {
        let mut inv = Inventory::new();
        inv.add(0, 1);
        inv.stop_using(0, 3);
        assert_eq!(inv.stock(0).used, 0);
        assert!(inv.start_using(0, 1));
        inv.release_all();
        assert_eq!(inv.stock(0).available(), 1);
    }
}
