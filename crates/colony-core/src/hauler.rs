//! Bulk transport between carriers and colonies.
//!
//! Each hauler runs a three-phase loop: pick a loaded carrier, fly to it and
//! take cargo at a bounded rate, then fly to the carrier's colony and unload
//! into the colony reserves. A destroyed target sends the hauler back to
//! `Idle` with its cargo intact.

use crate::catalog::Catalog;
use crate::config::HaulerConfig;
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Fixed64, Ticks, f64_to_fixed64, non_negative};
use crate::geometry::Vec3;
use crate::id::{CarrierId, ColonyId, HaulerId, ResourceTypeId};
use crate::ledger::Ledger;
use crate::stock::ColonyIndustryStock;
use crate::tech::carrier_colony;
use crate::world::World;
use log::{debug, trace, warn};

/// Squared distances closer than this are treated as equal during carrier
/// selection.
const DISTANCE_TIE_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HaulerPhase {
    #[default]
    Idle,
    ToCarrier,
    ToColony,
}

#[derive(Debug, Clone)]
pub struct Hauler {
    pub position: Vec3,
    pub capacity: Fixed64,
    pub cargo: Ledger,
    pub phase: HaulerPhase,
    pub target_carrier: Option<CarrierId>,
    pub target_colony: Option<ColonyId>,
    /// Units unloaded into colony reserves over the hauler's lifetime.
    pub delivered_total: Fixed64,
}

impl Hauler {
    pub fn new(position: Vec3, capacity: Fixed64) -> Self {
        Self {
            position,
            capacity: non_negative(capacity),
            cargo: Ledger::new(),
            phase: HaulerPhase::Idle,
            target_carrier: None,
            target_colony: None,
            delivered_total: Fixed64::ZERO,
        }
    }

    pub fn load(&self) -> Fixed64 {
        self.cargo.total()
    }

    pub fn free_space(&self) -> Fixed64 {
        non_negative(self.capacity - self.load())
    }

    fn reset(&mut self) {
        self.phase = HaulerPhase::Idle;
        self.target_carrier = None;
        self.target_colony = None;
    }
}

/// Outcome of one hauler stage run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HaulerReport {
    /// Number of unloads that deposited anything.
    pub deliveries: u32,
    pub delivered: Fixed64,
}

/// Cargo a hauler can deliver: types that map to a colony reserve.
pub(crate) fn haulable(catalog: &Catalog, ledger: &Ledger) -> impl Iterator<Item = (ResourceTypeId, Fixed64)> {
    ledger
        .entries()
        .iter()
        .filter(|e| e.available() > Fixed64::ZERO)
        .filter(move |e| catalog.resource(e.resource).and_then(|r| r.hauler_pool()).is_some())
        .map(|e| (e.resource, e.available()))
}

struct CarrierChoice {
    carrier: CarrierId,
    distance_sq: f32,
    dominant: Fixed64,
}

fn choose_carrier(
    world: &World,
    catalog: &Catalog,
    from: Vec3,
    min_load: Fixed64,
) -> Option<CarrierId> {
    let mut best: Option<CarrierChoice> = None;
    for (id, carrier) in &world.carriers {
        let mut load = Fixed64::ZERO;
        let mut dominant = Fixed64::ZERO;
        for (_, amount) in haulable(catalog, &carrier.cargo) {
            load = load.saturating_add(amount);
            dominant = dominant.max(amount);
        }
        if load <= Fixed64::ZERO || load < min_load {
            continue;
        }
        let distance_sq = from.distance_squared(&carrier.position);
        let better = match &best {
            None => true,
            Some(b) if distance_sq < b.distance_sq - DISTANCE_TIE_EPSILON => true,
            Some(b) => {
                (distance_sq - b.distance_sq).abs() <= DISTANCE_TIE_EPSILON && dominant > b.dominant
            }
        };
        if better {
            best = Some(CarrierChoice {
                carrier: id,
                distance_sq,
                dominant,
            });
        }
    }
    best.map(|b| b.carrier)
}

fn nearest_colony(
    world: &World,
    from: Vec3,
    accept: impl Fn(ColonyId) -> bool,
) -> Option<ColonyId> {
    let mut best: Option<(ColonyId, f32)> = None;
    for (id, colony) in &world.colonies {
        if !accept(id) {
            continue;
        }
        let d = from.distance_squared(&colony.position);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((id, d));
        }
    }
    best.map(|(id, _)| id)
}

/// Colony a carrier's cargo should go to: its home or owner's colony, else
/// the nearest colony of its faction, else the nearest colony with reserves.
fn colony_for_carrier(world: &World, carrier: CarrierId) -> Option<ColonyId> {
    if let Some(colony) = carrier_colony(world, carrier) {
        return Some(colony);
    }
    let record = world.carriers.get(carrier)?;
    if let Some(faction) = record.faction {
        let found = nearest_colony(world, record.position, |c| {
            world.colonies.get(c).and_then(|c| c.faction) == Some(faction)
        });
        if found.is_some() {
            return found;
        }
    }
    nearest_colony(world, record.position, |c| {
        world.colonies.get(c).is_some_and(|c| c.stock.is_some())
    })
}

fn plan_idle(world: &mut World, catalog: &Catalog, config: &HaulerConfig, id: HaulerId) {
    let Some(hauler) = world.haulers.get(id) else {
        return;
    };
    let position = hauler.position;

    if haulable(catalog, &hauler.cargo).next().is_some() {
        let target = nearest_colony(world, position, |c| {
            world.colonies.get(c).is_some_and(|c| c.stock.is_some())
        })
        .or_else(|| nearest_colony(world, position, |_| true));
        if let (Some(colony), Some(hauler)) = (target, world.haulers.get_mut(id)) {
            debug!("hauler {id:?} carrying leftover cargo to colony {colony:?}");
            hauler.target_colony = Some(colony);
            hauler.phase = HaulerPhase::ToColony;
        }
        return;
    }

    let min_load = f64_to_fixed64(config.min_carrier_load.max(0.0));
    let Some(carrier) = choose_carrier(world, catalog, position, min_load) else {
        return;
    };
    let Some(colony) = colony_for_carrier(world, carrier) else {
        trace!("hauler {id:?}: carrier {carrier:?} has no colony to deliver to");
        return;
    };
    if let Some(hauler) = world.haulers.get_mut(id) {
        debug!("hauler {id:?} assigned carrier {carrier:?} for colony {colony:?}");
        hauler.target_carrier = Some(carrier);
        hauler.target_colony = Some(colony);
        hauler.phase = HaulerPhase::ToCarrier;
    }
}

fn run_to_carrier(world: &mut World, catalog: &Catalog, config: &HaulerConfig, id: HaulerId, dt: f32) {
    let World {
        haulers,
        carriers,
        colonies,
        ..
    } = world;
    let Some(hauler) = haulers.get_mut(id) else {
        return;
    };
    let colony_alive = hauler.target_colony.is_some_and(|c| colonies.contains_key(c));
    let Some(carrier) = hauler.target_carrier.and_then(|c| carriers.get_mut(c)) else {
        debug!("hauler {id:?} lost its carrier, resetting");
        hauler.reset();
        return;
    };
    if !colony_alive {
        debug!("hauler {id:?} lost its colony, resetting");
        hauler.reset();
        return;
    }

    hauler.position = hauler
        .position
        .step_towards(&carrier.position, config.speed.max(0.0) * dt);
    if hauler.position.distance(&carrier.position) > config.pickup_radius {
        return;
    }

    let rate = f64_to_fixed64(config.transfer_rate_per_second.max(0.0) * f64::from(dt));
    let mut budget = rate.min(hauler.free_space());
    let lines: Vec<(ResourceTypeId, Fixed64)> = haulable(catalog, &carrier.cargo).collect();
    for (resource, amount) in lines {
        if budget <= Fixed64::ZERO {
            break;
        }
        let taken = carrier.cargo.remove(resource, amount.min(budget));
        let overflow = hauler.cargo.add(resource, taken);
        if overflow > Fixed64::ZERO {
            let lost = carrier.cargo.add(resource, overflow);
            if lost > Fixed64::ZERO {
                warn!("hauler {id:?}: {lost} of {resource:?} fit neither hauler nor carrier");
            }
        }
        let moved = taken - overflow;
        budget = non_negative(budget - moved);
        trace!("hauler {id:?} loaded {moved} of {resource:?}");
    }

    let carrier_empty = haulable(catalog, &carrier.cargo).next().is_none();
    if hauler.free_space() <= Fixed64::ZERO || carrier_empty {
        hauler.phase = HaulerPhase::ToColony;
        hauler.target_carrier = None;
    }
}

fn run_to_colony(
    world: &mut World,
    catalog: &Catalog,
    config: &HaulerConfig,
    id: HaulerId,
    dt: f32,
    now: Ticks,
    events: &mut EventLog,
) -> Fixed64 {
    let World {
        haulers, colonies, ..
    } = world;
    let Some(hauler) = haulers.get_mut(id) else {
        return Fixed64::ZERO;
    };
    let Some(colony_id) = hauler.target_colony.filter(|c| colonies.contains_key(*c)) else {
        debug!("hauler {id:?} lost its colony, resetting");
        hauler.reset();
        return Fixed64::ZERO;
    };
    let Some(colony) = colonies.get_mut(colony_id) else {
        return Fixed64::ZERO;
    };

    hauler.position = hauler
        .position
        .step_towards(&colony.position, config.speed.max(0.0) * dt);
    if hauler.position.distance(&colony.position) > config.dropoff_radius {
        return Fixed64::ZERO;
    }

    let stock = colony.stock.get_or_insert_with(ColonyIndustryStock::new);
    let mut delivered = Fixed64::ZERO;
    let lines: Vec<(ResourceTypeId, Fixed64)> = hauler
        .cargo
        .entries()
        .iter()
        .filter(|e| e.amount > Fixed64::ZERO)
        .map(|e| (e.resource, e.amount))
        .collect();
    for (resource, amount) in lines {
        let Some(pool) = catalog.resource(resource).and_then(|r| r.hauler_pool()) else {
            warn!("hauler {id:?}: no reserve for {resource:?}, keeping {amount} aboard");
            continue;
        };
        let unloaded = hauler.cargo.remove(resource, amount);
        stock.deposit(pool, unloaded);
        delivered += unloaded;
        trace!("hauler {id:?} unloaded {unloaded} of {resource:?} into {}", pool.name());
    }
    if delivered > Fixed64::ZERO {
        stock.last_update_tick = now;
        hauler.delivered_total = hauler.delivered_total.saturating_add(delivered);
        events.emit(EconomyEvent::HaulerDelivered {
            hauler: id,
            colony: colony_id,
            amount: delivered,
            tick: now,
        });
    }
    hauler.reset();
    delivered
}

/// Advance every hauler by `dt` seconds.
pub fn run_haulers(
    world: &mut World,
    catalog: &Catalog,
    config: &HaulerConfig,
    dt: f32,
    now: Ticks,
    events: &mut EventLog,
) -> HaulerReport {
    let mut report = HaulerReport::default();
    let ids: Vec<HaulerId> = world.haulers.keys().collect();
    for id in ids {
        if world.haulers.get(id).is_some_and(|h| h.phase == HaulerPhase::Idle) {
            plan_idle(world, catalog, config, id);
        }
        let Some(phase) = world.haulers.get(id).map(|h| h.phase) else {
            continue;
        };
        match phase {
            HaulerPhase::Idle => {}
            HaulerPhase::ToCarrier => run_to_carrier(world, catalog, config, id, dt),
            HaulerPhase::ToColony => {
                let delivered = run_to_colony(world, catalog, config, id, dt, now, events);
                if delivered > Fixed64::ZERO {
                    report.deliveries += 1;
                    report.delivered = report.delivered.saturating_add(delivered);
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, ResourceDef};
    use crate::fixed::fixed_int;
    use crate::market::MarketCategory;
    use crate::stock::StockPool;
    use crate::world::{Carrier, Colony};

    fn catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        b.register_resource(
            ResourceDef::new("minerals")
                .with_market(MarketCategory::RefinedMetal)
                .with_delivery_pool(StockPool::Ore),
        );
        b.register_resource(ResourceDef::new("relic_data").with_market(MarketCategory::Tech));
        b.build().unwrap()
    }

    struct Scene {
        world: World,
        catalog: Catalog,
        hauler: HaulerId,
        carrier: CarrierId,
        colony: ColonyId,
    }

    fn scene(cargo: i32) -> Scene {
        let catalog = catalog();
        let minerals = catalog.resource_id("minerals").unwrap();
        let mut world = World::new();
        let colony = world.add_colony(
            Colony::new("Ceres", Vec3::new(60.0, 0.0, 0.0)).with_stock(ColonyIndustryStock::new()),
        );
        let mut carrier = Carrier::new(Vec3::new(20.0, 0.0, 0.0)).with_home(colony);
        let _ = carrier.cargo.add(minerals, fixed_int(cargo));
        let carrier = world.add_carrier(carrier);
        let hauler = world.add_hauler(Hauler::new(Vec3::ZERO, fixed_int(50)));
        Scene {
            world,
            catalog,
            hauler,
            carrier,
            colony,
        }
    }

    fn tick(s: &mut Scene, now: Ticks, events: &mut EventLog) -> HaulerReport {
        run_haulers(&mut s.world, &s.catalog, &HaulerConfig::default(), 1.0, now, events)
    }

    #[test]
    fn delivers_capacity_and_leaves_remainder() {
        let mut s = scene(80);
        let minerals = s.catalog.resource_id("minerals").unwrap();
        let mut events = EventLog::new();

        // Reaches the carrier and loads a full hold in one tick.
        tick(&mut s, 1, &mut events);
        assert_eq!(s.world.haulers[s.hauler].phase, HaulerPhase::ToColony);
        assert_eq!(s.world.haulers[s.hauler].load(), fixed_int(50));
        assert_eq!(s.world.carriers[s.carrier].cargo.amount(minerals), fixed_int(30));

        // 40 units to the colony at speed 30.
        let report = tick(&mut s, 2, &mut events);
        assert_eq!(report.deliveries, 0);
        let report = tick(&mut s, 3, &mut events);
        assert_eq!(report.delivered, fixed_int(50));

        let stock = s.world.colonies[s.colony].stock.as_ref().unwrap();
        assert_eq!(stock.ore, fixed_int(50));
        assert_eq!(s.world.haulers[s.hauler].phase, HaulerPhase::Idle);
        assert_eq!(s.world.haulers[s.hauler].load(), Fixed64::ZERO);
        assert_eq!(s.world.carriers[s.carrier].cargo.amount(minerals), fixed_int(30));
        assert!(matches!(
            events.events().last(),
            Some(EconomyEvent::HaulerDelivered { amount, .. }) if *amount == fixed_int(50)
        ));
    }

    #[test]
    fn light_carriers_are_ignored() {
        let mut s = scene(5);
        let mut events = EventLog::new();
        tick(&mut s, 1, &mut events);
        assert_eq!(s.world.haulers[s.hauler].phase, HaulerPhase::Idle);
        assert_eq!(s.world.haulers[s.hauler].position, Vec3::ZERO);
    }

    #[test]
    fn destroyed_carrier_resets_to_idle() {
        let mut s = scene(80);
        s.world.haulers[s.hauler].position = Vec3::new(-100.0, 0.0, 0.0);
        let mut events = EventLog::new();
        tick(&mut s, 1, &mut events);
        assert_eq!(s.world.haulers[s.hauler].phase, HaulerPhase::ToCarrier);

        s.world.remove_carrier(s.carrier);
        tick(&mut s, 2, &mut events);
        let hauler = &s.world.haulers[s.hauler];
        assert_eq!(hauler.phase, HaulerPhase::Idle);
        assert_eq!(hauler.target_carrier, None);
    }

    #[test]
    fn destroyed_colony_keeps_cargo() {
        let mut s = scene(80);
        let mut events = EventLog::new();
        tick(&mut s, 1, &mut events);
        s.world.remove_colony(s.colony);
        tick(&mut s, 2, &mut events);
        let hauler = &s.world.haulers[s.hauler];
        assert_eq!(hauler.phase, HaulerPhase::Idle);
        assert_eq!(hauler.load(), fixed_int(50));
    }

    #[test]
    fn nearest_carrier_wins_then_dominant_cargo() {
        let catalog = catalog();
        let minerals = catalog.resource_id("minerals").unwrap();
        let mut world = World::new();
        let mut near = Carrier::new(Vec3::new(10.0, 0.0, 0.0));
        let _ = near.cargo.add(minerals, fixed_int(20));
        let mut far = Carrier::new(Vec3::new(30.0, 0.0, 0.0));
        let _ = far.cargo.add(minerals, fixed_int(200));
        let near = world.add_carrier(near);
        world.add_carrier(far);
        assert_eq!(choose_carrier(&world, &catalog, Vec3::ZERO, fixed_int(10)), Some(near));

        let mut twin = Carrier::new(Vec3::new(-10.0, 0.0, 0.0));
        let _ = twin.cargo.add(minerals, fixed_int(40));
        let twin = world.add_carrier(twin);
        assert_eq!(choose_carrier(&world, &catalog, Vec3::ZERO, fixed_int(10)), Some(twin));
    }

    #[test]
    fn unmapped_cargo_is_not_hauled() {
        let catalog = catalog();
        let relic = catalog.resource_id("relic_data").unwrap();
        let mut world = World::new();
        let mut carrier = Carrier::new(Vec3::ZERO);
        let _ = carrier.cargo.add(relic, fixed_int(100));
        world.add_carrier(carrier);
        assert_eq!(choose_carrier(&world, &catalog, Vec3::ZERO, fixed_int(10)), None);
    }
}
