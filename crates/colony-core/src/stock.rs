//! Colony-wide reserve pools.
//!
//! Every colony with an industry bootstrap carries one [`ColonyIndustryStock`].
//! The feed stage grows it, haulers and the market bridge deposit into it, and
//! procurement pulls from it. Reserves are unbounded above and never negative.

use crate::fixed::{Fixed64, Ticks, non_negative};
use serde::{Deserialize, Serialize};

/// One of the colony's reserve pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPool {
    Ore,
    Supplies,
    Food,
    Water,
    Fuel,
    Research,
}

impl StockPool {
    pub const ALL: [StockPool; 6] = [
        StockPool::Ore,
        StockPool::Supplies,
        StockPool::Food,
        StockPool::Water,
        StockPool::Fuel,
        StockPool::Research,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StockPool::Ore => "ore",
            StockPool::Supplies => "supplies",
            StockPool::Food => "food",
            StockPool::Water => "water",
            StockPool::Fuel => "fuel",
            StockPool::Research => "research",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyIndustryStock {
    pub ore: Fixed64,
    pub supplies: Fixed64,
    pub food: Fixed64,
    pub water: Fixed64,
    pub fuel: Fixed64,
    pub research: Fixed64,
    pub last_update_tick: Ticks,
}

impl ColonyIndustryStock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter used when bootstrapping a colony.
    pub fn with(mut self, pool: StockPool, amount: Fixed64) -> Self {
        *self.slot_mut(pool) = non_negative(amount);
        self
    }

    fn slot_mut(&mut self, pool: StockPool) -> &mut Fixed64 {
        match pool {
            StockPool::Ore => &mut self.ore,
            StockPool::Supplies => &mut self.supplies,
            StockPool::Food => &mut self.food,
            StockPool::Water => &mut self.water,
            StockPool::Fuel => &mut self.fuel,
            StockPool::Research => &mut self.research,
        }
    }

    pub fn get(&self, pool: StockPool) -> Fixed64 {
        match pool {
            StockPool::Ore => self.ore,
            StockPool::Supplies => self.supplies,
            StockPool::Food => self.food,
            StockPool::Water => self.water,
            StockPool::Fuel => self.fuel,
            StockPool::Research => self.research,
        }
    }

    /// Take up to `amount` from a pool. Returns the amount actually taken.
    #[must_use = "returns the amount actually pulled, which may be less than requested"]
    pub fn pull(&mut self, pool: StockPool, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let slot = self.slot_mut(pool);
        let pulled = amount.min(*slot);
        *slot = non_negative(*slot - pulled);
        pulled
    }

    pub fn deposit(&mut self, pool: StockPool, amount: Fixed64) {
        if amount <= Fixed64::ZERO {
            return;
        }
        let slot = self.slot_mut(pool);
        *slot = slot.saturating_add(amount);
    }

    /// Consume up to `amount` from a pool, clamping at zero. Returns the
    /// shortfall that could not be covered.
    pub fn consume(&mut self, pool: StockPool, amount: Fixed64) -> Fixed64 {
        let taken = self.pull(pool, amount);
        non_negative(amount - taken)
    }

    pub fn total(&self) -> Fixed64 {
        StockPool::ALL
            .iter()
            .fold(Fixed64::ZERO, |acc, &p| acc.saturating_add(self.get(p)))
    }

    pub fn is_consistent(&self) -> bool {
        StockPool::ALL.iter().all(|&p| self.get(p) >= Fixed64::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(v: i32) -> Fixed64 {
        Fixed64::from_num(v)
    }

    #[test]
    fn pull_is_capped_by_reserve() {
        let mut stock = ColonyIndustryStock::new().with(StockPool::Ore, units(5));
        assert_eq!(stock.pull(StockPool::Ore, units(20)), units(5));
        assert_eq!(stock.ore, Fixed64::ZERO);
        assert_eq!(stock.pull(StockPool::Ore, units(1)), Fixed64::ZERO);
    }

    #[test]
    fn deposit_and_total() {
        let mut stock = ColonyIndustryStock::new();
        stock.deposit(StockPool::Food, units(3));
        stock.deposit(StockPool::Fuel, units(2));
        stock.deposit(StockPool::Water, units(-4));
        assert_eq!(stock.total(), units(5));
        assert_eq!(stock.get(StockPool::Water), Fixed64::ZERO);
    }

    #[test]
    fn consume_reports_shortfall() {
        let mut stock = ColonyIndustryStock::new().with(StockPool::Water, units(2));
        assert_eq!(stock.consume(StockPool::Water, units(5)), units(3));
        assert_eq!(stock.water, Fixed64::ZERO);
        assert!(stock.is_consistent());
    }

    #[test]
    fn pool_names() {
        assert_eq!(StockPool::Research.name(), "research");
        assert_eq!(StockPool::ALL.len(), 6);
    }
}
