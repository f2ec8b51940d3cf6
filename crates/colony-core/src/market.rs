//! Colony-scoped price and supply table.

use crate::fixed::{Fixed64, checked_div_64, non_negative};
use serde::{Deserialize, Serialize};

/// Tradable resource category. Many resource types share one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    Ore,
    RefinedMetal,
    RareEarth,
    Energy,
    Food,
    Water,
    Industrial,
    Tech,
    Luxury,
    Military,
    Consumer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPriceEntry {
    pub category: MarketCategory,
    pub supply: Fixed64,
    pub buy_price: Fixed64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    entries: Vec<MarketPriceEntry>,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a category, or overwrite the supply and price of an existing one.
    pub fn list(&mut self, category: MarketCategory, supply: Fixed64, buy_price: Fixed64) {
        let supply = non_negative(supply);
        let buy_price = non_negative(buy_price);
        match self.entries.iter_mut().find(|e| e.category == category) {
            Some(entry) => {
                entry.supply = supply;
                entry.buy_price = buy_price;
            }
            None => self.entries.push(MarketPriceEntry {
                category,
                supply,
                buy_price,
            }),
        }
    }

    pub fn entry(&self, category: MarketCategory) -> Option<&MarketPriceEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn entries(&self) -> &[MarketPriceEntry] {
        &self.entries
    }

    pub fn supply(&self, category: MarketCategory) -> Fixed64 {
        self.entry(category).map(|e| e.supply).unwrap_or(Fixed64::ZERO)
    }

    pub fn total_supply(&self) -> Fixed64 {
        self.entries
            .iter()
            .fold(Fixed64::ZERO, |acc, e| acc.saturating_add(e.supply))
    }

    /// Buy up to `wanted` units of a category, paying from `credits`.
    ///
    /// The quantity is capped by supply and by what the credits afford at
    /// the listed price; a price of zero makes the goods free. Supply and
    /// credits are decremented together. Returns the quantity bought.
    pub fn purchase(
        &mut self,
        category: MarketCategory,
        wanted: Fixed64,
        credits: &mut Fixed64,
    ) -> Fixed64 {
        if wanted <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let Some(entry) = self.entries.iter_mut().find(|e| e.category == category) else {
            return Fixed64::ZERO;
        };

        let mut bought = wanted.min(entry.supply);
        if entry.buy_price > Fixed64::ZERO {
            let affordable =
                checked_div_64(non_negative(*credits), entry.buy_price).unwrap_or(Fixed64::ZERO);
            bought = bought.min(affordable);
        }
        if bought <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }

        entry.supply = non_negative(entry.supply - bought);
        if entry.buy_price > Fixed64::ZERO {
            let cost = bought.saturating_mul(entry.buy_price);
            *credits = non_negative(*credits - cost);
        }
        bought
    }

    /// Add supply to a listed category. Returns false if the category is not
    /// listed, in which case nothing changes.
    pub fn deposit(&mut self, category: MarketCategory, amount: Fixed64) -> bool {
        match self.entries.iter_mut().find(|e| e.category == category) {
            Some(entry) => {
                if amount > Fixed64::ZERO {
                    entry.supply = entry.supply.saturating_add(amount);
                }
                true
            }
            None => false,
        }
    }
}
