//! Direct unloading from parked carriers into colony reserves.
//!
//! A carrier within range of a colony unloads its reserve-mapped cargo
//! straight into that colony's pools, up to a per-second budget. The target
//! is the carrier's own colony when it is in range, otherwise the nearest
//! colony of the carrier's faction. Carriers without a faction unload at the
//! nearest colony of any faction. Only colonies with bootstrapped reserves
//! receive cargo.

use crate::catalog::Catalog;
use crate::config::ExportConfig;
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Fixed64, Ticks};
use crate::geometry::Vec3;
use crate::hauler::haulable;
use crate::id::{AssetRef, CarrierId, ColonyId, FactionId, ResourceTypeId};
use crate::tech::carrier_colony;
use crate::world::World;
use log::{debug, trace};

/// Outcome of one export stage run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Carriers that unloaded anything.
    pub carriers: u32,
    pub exported: Fixed64,
}

/// Faction a carrier flies for: its own tag, else the faction behind the
/// business that owns it.
pub fn carrier_faction(world: &World, carrier: CarrierId) -> Option<FactionId> {
    let record = world.carriers.get(carrier)?;
    if record.faction.is_some() {
        return record.faction;
    }
    let business = world.ownership.owner_of(AssetRef::Ship(carrier))?;
    let owner = world.businesses.get(business)?.owner?;
    world.owner_faction(owner)
}

fn receives(world: &World, colony: ColonyId, from: Vec3, config: &ExportConfig) -> bool {
    world
        .colonies
        .get(colony)
        .is_some_and(|c| c.stock.is_some() && config.in_range(from.distance(&c.position)))
}

fn nearest_receiver(
    world: &World,
    from: Vec3,
    config: &ExportConfig,
    accept: impl Fn(Option<FactionId>) -> bool,
) -> Option<ColonyId> {
    let mut best: Option<(ColonyId, f32)> = None;
    for (id, colony) in &world.colonies {
        if colony.stock.is_none() || !accept(colony.faction) {
            continue;
        }
        let distance = from.distance(&colony.position);
        if !config.in_range(distance) {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Colony a carrier would unload into this step, if any.
pub fn target_colony(world: &World, carrier: CarrierId, config: &ExportConfig) -> Option<ColonyId> {
    let position = world.carriers.get(carrier)?.position;
    if let Some(home) = carrier_colony(world, carrier).filter(|c| receives(world, *c, position, config)) {
        return Some(home);
    }
    match carrier_faction(world, carrier) {
        Some(faction) => nearest_receiver(world, position, config, |f| f == Some(faction)),
        None => nearest_receiver(world, position, config, |_| true),
    }
}

fn export_carrier(
    world: &mut World,
    catalog: &Catalog,
    config: &ExportConfig,
    id: CarrierId,
    budget: Fixed64,
    now: Ticks,
    events: &mut EventLog,
) -> Fixed64 {
    if world.carriers.get(id).is_none_or(|c| c.cargo.total() <= Fixed64::ZERO) {
        return Fixed64::ZERO;
    }
    let Some(colony_id) = target_colony(world, id, config) else {
        return Fixed64::ZERO;
    };
    let World {
        carriers, colonies, ..
    } = world;
    let (Some(carrier), Some(stock)) = (
        carriers.get_mut(id),
        colonies.get_mut(colony_id).and_then(|c| c.stock.as_mut()),
    ) else {
        return Fixed64::ZERO;
    };

    let lines: Vec<(ResourceTypeId, Fixed64)> = haulable(catalog, &carrier.cargo).collect();
    let mut remaining = budget;
    let mut exported = Fixed64::ZERO;
    for (resource, amount) in lines {
        if remaining <= Fixed64::ZERO {
            break;
        }
        let Some(pool) = catalog.resource(resource).and_then(|r| r.hauler_pool()) else {
            continue;
        };
        let taken = carrier.cargo.remove(resource, amount.min(remaining));
        stock.deposit(pool, taken);
        remaining -= taken;
        exported += taken;
        trace!("carrier {id:?} unloaded {taken} of {resource:?} into {}", pool.name());
    }
    if exported > Fixed64::ZERO {
        stock.last_update_tick = now;
        debug!("carrier {id:?} exported {exported} into colony {colony_id:?}");
        events.emit(EconomyEvent::CarrierExported {
            carrier: id,
            colony: colony_id,
            amount: exported,
            tick: now,
        });
    }
    exported
}

/// Unload every in-range carrier for a step of `dt` seconds.
pub fn run_export(
    world: &mut World,
    catalog: &Catalog,
    config: &ExportConfig,
    dt: f32,
    now: Ticks,
    events: &mut EventLog,
) -> ExportReport {
    let mut report = ExportReport::default();
    let budget = config.budget(dt);
    if budget <= Fixed64::ZERO {
        return report;
    }
    let ids: Vec<CarrierId> = world.carriers.keys().collect();
    for id in ids {
        let exported = export_carrier(world, catalog, config, id, budget, now, events);
        if exported > Fixed64::ZERO {
            report.carriers += 1;
            report.exported = report.exported.saturating_add(exported);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, ResourceDef};
    use crate::event::EventKind;
    use crate::fixed::fixed_int;
    use crate::id::{BusinessKindId, FacilityClass, OwnerKind, OwnerRef};
    use crate::market::MarketCategory;
    use crate::stock::{ColonyIndustryStock, StockPool};
    use crate::world::{BusinessState, Carrier, Colony};

    fn catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        b.register_resource(
            ResourceDef::new("minerals")
                .with_market(MarketCategory::RefinedMetal)
                .with_delivery_pool(StockPool::Ore),
        );
        b.register_resource(
            ResourceDef::new("energy_crystals")
                .with_market(MarketCategory::Energy)
                .with_delivery_pool(StockPool::Supplies),
        );
        b.register_resource(ResourceDef::new("relic_data").with_market(MarketCategory::Tech));
        b.build().unwrap()
    }

    fn reserve_colony(world: &mut World, name: &str, x: f32) -> ColonyId {
        world.add_colony(Colony::new(name, Vec3::new(x, 0.0, 0.0)).with_stock(ColonyIndustryStock::new()))
    }

    fn units_held(world: &World, carrier: CarrierId, colony: ColonyId) -> Fixed64 {
        world.carriers[carrier].cargo.total() + world.colonies[colony].stock.as_ref().unwrap().total()
    }

    #[test]
    fn unloads_home_colony_within_budget() {
        let catalog = catalog();
        let minerals = catalog.resource_id("minerals").unwrap();
        let crystals = catalog.resource_id("energy_crystals").unwrap();
        let mut world = World::new();
        let colony = reserve_colony(&mut world, "Ceres", 0.0);
        let mut carrier = Carrier::new(Vec3::new(10.0, 0.0, 0.0)).with_home(colony);
        let _ = carrier.cargo.add(minerals, fixed_int(15));
        let _ = carrier.cargo.add(crystals, fixed_int(30));
        let carrier = world.add_carrier(carrier);
        let before = units_held(&world, carrier, colony);

        let mut events = EventLog::new();
        let report = run_export(&mut world, &catalog, &ExportConfig::default(), 1.0, 4, &mut events);

        assert_eq!(report.carriers, 1);
        assert_eq!(report.exported, fixed_int(20));
        let stock = world.colonies[colony].stock.as_ref().unwrap();
        assert_eq!(stock.get(StockPool::Ore), fixed_int(15));
        assert_eq!(stock.get(StockPool::Supplies), fixed_int(5));
        assert_eq!(stock.last_update_tick, 4);
        assert_eq!(world.carriers[carrier].cargo.amount(crystals), fixed_int(25));
        assert_eq!(units_held(&world, carrier, colony), before);
        assert_eq!(events.events()[0].kind(), EventKind::CarrierExported);
    }

    #[test]
    fn out_of_range_carrier_keeps_cargo() {
        let catalog = catalog();
        let minerals = catalog.resource_id("minerals").unwrap();
        let mut world = World::new();
        let colony = reserve_colony(&mut world, "Ceres", 0.0);
        let mut carrier = Carrier::new(Vec3::new(16.0, 0.0, 0.0)).with_home(colony);
        let _ = carrier.cargo.add(minerals, fixed_int(10));
        let carrier = world.add_carrier(carrier);

        let mut events = EventLog::new();
        let report = run_export(&mut world, &catalog, &ExportConfig::default(), 1.0, 0, &mut events);
        assert_eq!(report, ExportReport::default());
        assert_eq!(world.carriers[carrier].cargo.amount(minerals), fixed_int(10));
        assert!(events.is_empty());

        let unlimited = ExportConfig {
            max_transfer_distance: 0.0,
            ..ExportConfig::default()
        };
        let report = run_export(&mut world, &catalog, &unlimited, 1.0, 1, &mut events);
        assert_eq!(report.exported, fixed_int(10));
        let stock = world.colonies[colony].stock.as_ref().unwrap();
        assert_eq!(stock.get(StockPool::Ore), fixed_int(10));
    }

    #[test]
    fn unmapped_cargo_stays_aboard() {
        let catalog = catalog();
        let relic = catalog.resource_id("relic_data").unwrap();
        let mut world = World::new();
        let colony = reserve_colony(&mut world, "Ceres", 0.0);
        let mut carrier = Carrier::new(Vec3::ZERO).with_home(colony);
        let _ = carrier.cargo.add(relic, fixed_int(8));
        let carrier = world.add_carrier(carrier);

        let mut events = EventLog::new();
        let report = run_export(&mut world, &catalog, &ExportConfig::default(), 1.0, 0, &mut events);
        assert_eq!(report.carriers, 0);
        assert_eq!(world.carriers[carrier].cargo.amount(relic), fixed_int(8));
    }

    #[test]
    fn faction_carrier_skips_foreign_colonies() {
        let catalog = catalog();
        let minerals = catalog.resource_id("minerals").unwrap();
        let mut world = World::new();
        let union = world.add_faction("Union", None);
        let league = world.add_faction("League", None);
        let foreign = reserve_colony(&mut world, "Pallas", 2.0);
        world.colonies[foreign].faction = Some(league);
        let friendly = reserve_colony(&mut world, "Vesta", 12.0);
        world.colonies[friendly].faction = Some(union);

        let mut tagged = Carrier::new(Vec3::ZERO);
        tagged.faction = Some(union);
        let _ = tagged.cargo.add(minerals, fixed_int(5));
        let tagged = world.add_carrier(tagged);

        let mut stray = Carrier::new(Vec3::ZERO);
        let _ = stray.cargo.add(minerals, fixed_int(5));
        let stray = world.add_carrier(stray);

        let config = ExportConfig::default();
        assert_eq!(target_colony(&world, tagged, &config), Some(friendly));
        assert_eq!(target_colony(&world, stray, &config), Some(foreign));
    }

    #[test]
    fn owned_carrier_inherits_business_faction() {
        let mut world = World::new();
        let union = world.add_faction("Union", None);
        let colony = reserve_colony(&mut world, "Ceres", 0.0);
        let mut business = BusinessState::new(BusinessKindId(0), OwnerKind::Faction, colony, 0);
        business.owner = Some(OwnerRef::Faction(union));
        let business = world.businesses.insert(business);
        let ship = world.add_carrier(Carrier::new(Vec3::ZERO));
        world.ownership.assign(business, AssetRef::Ship(ship), 0, "");
        world.add_facility(colony, FacilityClass::Shipyard);

        assert_eq!(carrier_faction(&world, ship), Some(union));
        assert_eq!(target_colony(&world, ship, &ExportConfig::default()), Some(colony));
    }
}
