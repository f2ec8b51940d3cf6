//! Cross-crate tests: load the bundled data set with `colony-data` and run
//! the economy engine on it.

use std::sync::Arc;

use colony_core::config::SimulationConfig;
use colony_core::engine::Engine;
use colony_core::event::{EconomyEvent, EventKind};
use colony_core::fixed::{Fixed64, fixed_int};
use colony_core::geometry::Vec3;
use colony_core::hauler::Hauler;
use colony_core::id::*;
use colony_core::market::MarketCategory;
use colony_core::scheduler::JobBlock;
use colony_core::stock::{ColonyIndustryStock, StockPool};
use colony_core::test_utils::*;
use colony_core::validation::{check_invariants, validate_determinism};
use colony_core::world::{Carrier, Colony};
use colony_data::{EconomyData, default_data_dir, load_economy_data};

fn bundled() -> EconomyData {
    load_economy_data(&default_data_dir()).expect("bundled data loads")
}

/// Engine on the bundled catalog with one industrial colony that also has a
/// shipyard. `processing` sets the colony's processing tech tier.
fn bundled_engine(processing: u8) -> (Engine, ColonyId) {
    let data = bundled();
    let mut engine = Engine::new(Arc::new(data.catalog), data.config);
    let world = engine.world_mut();
    let faction = world.add_faction("Union", None);
    let colony = add_industrial_colony(world, "Ceres", Vec3::ZERO, 10_000, 40);
    world.add_facility(colony, FacilityClass::Shipyard);
    let record = &mut world.colonies[colony];
    record.faction = Some(faction);
    record.tech.processing = processing;
    (engine, colony)
}

fn business_of_kind(engine: &Engine, name: &str) -> BusinessId {
    let kind = engine.catalog().business_id(name).unwrap();
    engine
        .world()
        .businesses
        .iter()
        .find(|(_, b)| b.kind == kind)
        .map(|(id, _)| id)
        .unwrap()
}

#[test]
fn bundled_data_loads() {
    let data = bundled();
    assert_eq!(data.catalog.resource_count(), 21);
    assert_eq!(data.catalog.job_count(), 10);
    assert_eq!(data.catalog.business_count(), 7);
    assert_eq!(data.config, SimulationConfig::default());

    let minerals = data.catalog.resource_id("minerals").unwrap();
    let def = data.catalog.resource(minerals).unwrap();
    assert_eq!(def.hauler_pool(), Some(StockPool::Ore));
    assert!(def.stock_pool.is_none());

    for name in ["volatile_motes", "liquid_ozone", "salvage_components"] {
        let id = data.catalog.resource_id(name).unwrap();
        assert_eq!(data.catalog.resource(id).unwrap().market, Some(MarketCategory::Industrial), "{name}");
    }
    let strontium = data.catalog.resource_id("strontium_clathrates").unwrap();
    assert_eq!(data.catalog.resource(strontium).unwrap().market, Some(MarketCategory::Military));
}

#[test]
fn spawn_builds_every_archetype_and_fleet() {
    let (mut engine, colony) = bundled_engine(0);
    let result = engine.step(&colony_core::sim::TickClock::new(0, 1.0));
    assert_eq!(result.businesses_spawned, 7);

    let world = engine.world();
    assert!(world.businesses.values().all(|b| b.colony == colony));
    // Group and individual archetypes get their own owner records.
    assert_eq!(world.owners.len(), 5);

    let mut hulls: Vec<&str> = world.carriers.values().filter_map(|c| c.hull.as_deref()).collect();
    hulls.sort_unstable();
    assert_eq!(hulls, ["cv-mule", "lcv-sparrow"]);

    let hub = business_of_kind(&engine, "market_hub");
    assert_eq!(world.businesses[hub].owner, Some(OwnerRef::Faction(world.colonies[colony].faction.unwrap())));
    // Three facility claims (the production hall goes to the first claimant)
    // and two starter ships.
    assert_eq!(world.ownership.len(), 5);
}

#[test]
fn tech_gate_holds_refinery_until_researched() {
    let (mut untrained, _) = bundled_engine(0);
    run_ticks(&mut untrained, 0, 1);
    let works = business_of_kind(&untrained, "refinery_works");
    let refining = untrained.catalog().job_id("refining_ore").unwrap();
    let diagnostic = untrained.diagnose_business(works).unwrap();
    assert_eq!(diagnostic.active_job, None);
    assert!(diagnostic.candidates.contains(&(refining, Err(JobBlock::TechTier { have: 0, need: 1 }))));
    assert_eq!(diagnostic.ready_jobs().count(), 0);

    let (mut researched, _) = bundled_engine(1);
    run_ticks(&mut researched, 0, 1);
    let works = business_of_kind(&researched, "refinery_works");
    let active = researched.world().businesses[works].active_job.unwrap();
    assert_eq!(active.job, refining);
    assert_eq!(active.completes_tick, 10);
}

#[test]
fn mining_company_completes_first_contract() {
    let (mut engine, _) = bundled_engine(0);
    run_ticks(&mut engine, 0, 11);
    let mining_co = business_of_kind(&engine, "mining_co");
    let mining = engine.catalog().job_id("mining_basic").unwrap();

    assert!(engine.events().contains(&EconomyEvent::JobCompleted {
        business: mining_co,
        job: mining,
        tick: 10,
    }));
    let ore = engine.catalog().resource_id("ore").unwrap();
    // 6 ore produced at tick 10; the bridge exported 4 of it the same tick.
    assert_eq!(engine.world().businesses[mining_co].ledger.amount(ore), fixed_int(2));
}

#[test]
fn long_run_keeps_invariants() {
    let (mut engine, _) = bundled_engine(2);
    for result in run_ticks(&mut engine, 0, 200) {
        assert!(result.ran);
    }
    assert_eq!(check_invariants(engine.world()), Vec::new());
    let completed = engine
        .events()
        .iter()
        .filter(|e| e.kind() == EventKind::JobCompleted)
        .count();
    assert!(completed >= 10, "completed = {completed}");
}

#[test]
fn hauler_skips_cargo_without_reserve() {
    let data = bundled();
    let config = SimulationConfig {
        procurement_interval: 0,
        bridge_interval: 0,
        ..data.config
    };
    let mut engine = Engine::new(Arc::new(data.catalog), config);
    let minerals = engine.catalog().resource_id("minerals").unwrap();
    let relic_data = engine.catalog().resource_id("relic_data").unwrap();

    let (colony, carrier) = {
        let world = engine.world_mut();
        let colony = world.add_colony(
            Colony::new("Ceres", Vec3::new(60.0, 0.0, 0.0)).with_stock(ColonyIndustryStock::new()),
        );
        let mut carrier = Carrier::new(Vec3::new(20.0, 0.0, 0.0)).with_home(colony);
        let _ = carrier.cargo.add(minerals, fixed_int(40));
        let _ = carrier.cargo.add(relic_data, fixed_int(30));
        let carrier = world.add_carrier(carrier);
        world.add_hauler(Hauler::new(Vec3::ZERO, fixed_int(100)));
        (colony, carrier)
    };

    run_ticks(&mut engine, 0, 6);

    let world = engine.world();
    let stock = world.colonies[colony].stock.as_ref().unwrap();
    assert_eq!(stock.get(StockPool::Ore), fixed_int(40));
    assert_eq!(world.carriers[carrier].cargo.amount(minerals), Fixed64::ZERO);
    assert_eq!(world.carriers[carrier].cargo.amount(relic_data), fixed_int(30));
}

#[test]
fn bundled_economy_is_deterministic() {
    let result = validate_determinism(|| bundled_engine(1).0, 60);
    assert!(result.is_deterministic, "diverged at {:?}", result.divergence_tick);
}
