//! Market bridge: export business surplus into colony reserves or the
//! colony market.

use crate::catalog::Catalog;
use crate::config::SimulationConfig;
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{BusinessId, ResourceTypeId};
use crate::procurement::desired_buffer;
use crate::world::World;
use log::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeReport {
    pub to_stock: Fixed64,
    pub to_market: Fixed64,
}

impl BridgeReport {
    pub fn total(&self) -> Fixed64 {
        self.to_stock.saturating_add(self.to_market)
    }
}

/// Move up to `max_transfer_per_tick` of each surplus resource out of every
/// business ledger. A business keeps the larger of the resource's reserve
/// and its own procurement target, and never exports reserved units.
pub fn run_market_bridge(
    world: &mut World,
    catalog: &Catalog,
    config: &SimulationConfig,
    now: Ticks,
    events: &mut EventLog,
) -> BridgeReport {
    let cap = config.max_transfer();
    let mut report = BridgeReport::default();
    if cap <= Fixed64::ZERO {
        return report;
    }

    let World {
        businesses,
        colonies,
        ..
    } = world;

    let ids: Vec<BusinessId> = businesses.keys().collect();
    for id in ids {
        let Some(business) = businesses.get_mut(id) else {
            continue;
        };
        let Some(colony) = colonies.get_mut(business.colony) else {
            continue;
        };
        let buffer = desired_buffer(catalog, config, business.kind);
        let lines: Vec<(ResourceTypeId, Fixed64)> = business
            .ledger
            .entries()
            .iter()
            .map(|e| (e.resource, e.available()))
            .collect();

        for (resource, available) in lines {
            let Some(def) = catalog.resource(resource) else {
                continue;
            };
            let target = buffer
                .iter()
                .find(|(r, _)| *r == resource)
                .map(|(_, units)| *units)
                .unwrap_or(Fixed64::ZERO);
            // Holding back the procurement target too stops the next
            // procurement run from buying back what was just exported.
            let keep = def.reserve.max(target);
            if available <= keep {
                continue;
            }
            let amount = (available - keep).min(cap);

            let stock = def.stock_pool.zip(colony.stock.as_mut());
            let market = def
                .market
                .filter(|c| colony.market.as_ref().is_some_and(|m| m.entry(*c).is_some()));
            if stock.is_none() && market.is_none() {
                continue;
            }

            let removed = business.ledger.remove(resource, amount);
            if removed <= Fixed64::ZERO {
                continue;
            }
            if let Some((pool, stock)) = stock {
                stock.deposit(pool, removed);
                stock.last_update_tick = now;
                report.to_stock += removed;
                trace!("business {id:?} exported {removed} of {resource:?} to {}", pool.name());
            } else if let (Some(category), Some(market)) = (market, colony.market.as_mut()) {
                market.deposit(category, removed);
                report.to_market += removed;
                trace!("business {id:?} exported {removed} of {resource:?} to market {category:?}");
            }
            events.emit(EconomyEvent::Exported {
                business: id,
                resource,
                amount: removed,
                tick: now,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BusinessDefinition, CatalogBuilder, JobDefinition, ResourceDef};
    use crate::fixed::fixed_int;
    use crate::geometry::Vec3;
    use crate::id::OwnerKind;
    use crate::market::{Market, MarketCategory};
    use crate::stock::{ColonyIndustryStock, StockPool};
    use crate::world::{BusinessState, Colony};

    struct Fixture {
        world: World,
        catalog: Catalog,
        business: BusinessId,
    }

    fn fixture(stock: bool) -> Fixture {
        let mut b = CatalogBuilder::new();
        let ore = b.register_resource(
            ResourceDef::new("ore")
                .with_market(MarketCategory::Ore)
                .with_stock_pool(StockPool::Ore),
        );
        let ingot = b.register_resource(ResourceDef::new("ingot").with_market(MarketCategory::RefinedMetal));
        b.register_resource(ResourceDef::new("relic_data"));
        b.register_resource(
            ResourceDef::new("food")
                .with_market(MarketCategory::Food)
                .with_stock_pool(StockPool::Food)
                .with_reserve(fixed_int(4)),
        );
        let smelt = b.register_job(
            JobDefinition::new("smelt", 6)
                .input(ore, fixed_int(2))
                .output(ingot, fixed_int(1)),
        );
        let kind = b.register_business(BusinessDefinition::new("refinery", OwnerKind::Faction).job(smelt));
        let catalog = b.build().unwrap();

        let mut world = World::new();
        let mut market = Market::new();
        market.list(MarketCategory::RefinedMetal, Fixed64::ZERO, fixed_int(3));
        let mut colony = Colony::new("Ceres", Vec3::ZERO).with_market(market);
        if stock {
            colony = colony.with_stock(ColonyIndustryStock::new());
        }
        let colony = world.add_colony(colony);
        let business = world
            .businesses
            .insert(BusinessState::new(kind, OwnerKind::Faction, colony, 0));
        Fixture {
            world,
            catalog,
            business,
        }
    }

    fn give(f: &mut Fixture, name: &str, units: i32) {
        let id = f.catalog.resource_id(name).unwrap();
        let _ = f.world.businesses[f.business].ledger.add(id, fixed_int(units));
    }

    fn amount(f: &Fixture, name: &str) -> Fixed64 {
        let id = f.catalog.resource_id(name).unwrap();
        f.world.businesses[f.business].ledger.amount(id)
    }

    fn bridge(f: &mut Fixture) -> BridgeReport {
        let mut events = EventLog::new();
        run_market_bridge(&mut f.world, &f.catalog, &SimulationConfig::default(), 0, &mut events)
    }

    #[test]
    fn keeps_procurement_buffer() {
        let mut f = fixture(true);
        give(&mut f, "ore", 10);
        let report = bridge(&mut f);
        // Target is 2 * 2 = 4; surplus 6 capped at 4.
        assert_eq!(report.to_stock, fixed_int(4));
        assert_eq!(amount(&f, "ore"), fixed_int(6));
        let colony = f.world.businesses[f.business].colony;
        assert_eq!(f.world.colonies[colony].stock.as_ref().unwrap().ore, fixed_int(4));
    }

    #[test]
    fn export_then_procurement_does_not_churn() {
        let mut f = fixture(true);
        give(&mut f, "ore", 10);
        bridge(&mut f);
        bridge(&mut f);
        assert_eq!(amount(&f, "ore"), fixed_int(4));

        let mut events = EventLog::new();
        let procured = crate::procurement::run_procurement(
            &mut f.world,
            &f.catalog,
            &SimulationConfig::default(),
            1,
            &mut events,
        );
        assert_eq!(procured.pulled_from_stock, Fixed64::ZERO);
        assert!(events.is_empty());
        assert_eq!(amount(&f, "ore"), fixed_int(4));
        assert_eq!(bridge(&mut f), BridgeReport::default());
    }

    #[test]
    fn staples_keep_their_reserve() {
        let mut f = fixture(true);
        give(&mut f, "food", 6);
        let report = bridge(&mut f);
        assert_eq!(report.to_stock, fixed_int(2));
        assert_eq!(amount(&f, "food"), fixed_int(4));
    }

    #[test]
    fn falls_back_to_market_supply() {
        let mut f = fixture(true);
        give(&mut f, "ingot", 3);
        let report = bridge(&mut f);
        assert_eq!(report.to_market, fixed_int(3));
        let colony = f.world.businesses[f.business].colony;
        let market = f.world.colonies[colony].market.as_ref().unwrap();
        assert_eq!(market.supply(MarketCategory::RefinedMetal), fixed_int(3));
    }

    #[test]
    fn unmapped_surplus_stays() {
        let mut f = fixture(true);
        give(&mut f, "relic_data", 9);
        assert_eq!(bridge(&mut f), BridgeReport::default());
        assert_eq!(amount(&f, "relic_data"), fixed_int(9));
    }

    #[test]
    fn unlisted_category_without_stock_stays() {
        let mut f = fixture(false);
        give(&mut f, "food", 20);
        assert_eq!(bridge(&mut f).total(), Fixed64::ZERO);
        assert_eq!(amount(&f, "food"), fixed_int(20));
    }

    #[test]
    fn reserved_units_are_not_exported() {
        let mut f = fixture(true);
        give(&mut f, "ore", 10);
        let ore = f.catalog.resource_id("ore").unwrap();
        assert!(f.world.businesses[f.business].ledger.reserve(ore, fixed_int(5)));
        let report = bridge(&mut f);
        // 5 available, keep 4, export 1.
        assert_eq!(report.to_stock, fixed_int(1));
        assert_eq!(amount(&f, "ore"), fixed_int(9));
    }
}
