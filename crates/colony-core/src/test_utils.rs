//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::sync::Arc;

use crate::catalog::{BusinessDefinition, Catalog, CatalogBuilder, JobDefinition, ResourceDef};
use crate::config::SimulationConfig;
use crate::engine::Engine;
use crate::fixed::{Fixed64, Ticks, fixed_int};
use crate::geometry::Vec3;
use crate::id::*;
use crate::market::{Market, MarketCategory};
use crate::sim::{StepResult, TickClock};
use crate::stock::{ColonyIndustryStock, StockPool};
use crate::world::{Colony, World};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Catalogs
// ===========================================================================

/// Staples with their market category and reserve pool.
const STAPLES: [(&str, MarketCategory, StockPool); 4] = [
    ("food", MarketCategory::Food, StockPool::Food),
    ("water", MarketCategory::Water, StockPool::Water),
    ("supplies", MarketCategory::Industrial, StockPool::Supplies),
    ("fuel", MarketCategory::Energy, StockPool::Fuel),
];

fn register_resources(b: &mut CatalogBuilder) {
    b.register_resource(
        ResourceDef::new("ore")
            .with_market(MarketCategory::Ore)
            .with_stock_pool(StockPool::Ore)
            .with_seed_amount(fixed_int(4)),
    );
    b.register_resource(ResourceDef::new("ingot").with_market(MarketCategory::RefinedMetal));
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
    for (name, market, pool) in STAPLES {
        b.register_resource(
            ResourceDef::new(name)
                .with_market(market)
                .with_stock_pool(pool)
                .with_reserve(fixed_int(4)),
        );
    }
}

/// One refinery archetype running `ore -> ingot` (2 ore, 1 ingot, 6 ticks).
pub fn refinery_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    register_resources(&mut b);
    let ore = b.resource_id("ore").unwrap();
    let ingot = b.resource_id("ingot").unwrap();
    let smelt = b.register_job(
        JobDefinition::new("smelt", 6)
            .requires(FacilityClass::Refinery)
            .input(ore, fixed_int(2))
            .output(ingot, fixed_int(1)),
    );
    b.register_business(
        BusinessDefinition::new("refinery", OwnerKind::Faction)
            .facility(FacilityClass::Refinery)
            .job(smelt)
            .credits(fixed_int(100)),
    );
    b.build().unwrap()
}

/// Refinery, a fabricator chain on top of it, and a hauling company that
/// receives a starter ship.
pub fn economy_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    register_resources(&mut b);
    let ore = b.resource_id("ore").unwrap();
    let ingot = b.resource_id("ingot").unwrap();
    let supplies = b.resource_id("supplies").unwrap();
    let food = b.resource_id("food").unwrap();

    let smelt = b.register_job(
        JobDefinition::new("smelt", 6)
            .requires(FacilityClass::Refinery)
            .input(ore, fixed_int(2))
            .output(ingot, fixed_int(1)),
    );
    let bulk_smelt = b.register_job(
        JobDefinition::new("bulk_smelt", 10)
            .requires(FacilityClass::Refinery)
            .tech_tier(2)
            .input(ore, fixed_int(4))
            .output(ingot, fixed_int(3)),
    );
    let fabricate = b.register_job(
        JobDefinition::new("fabricate_supplies", 8)
            .requires(FacilityClass::Production)
            .input(ingot, fixed_int(1))
            .output(supplies, fixed_int(2)),
    );
    let ration = b.register_job(
        JobDefinition::new("pack_rations", 4)
            .input(supplies, fixed_int(1))
            .output(food, fixed_int(2)),
    );

    b.register_business(
        BusinessDefinition::new("refinery", OwnerKind::Faction)
            .facility(FacilityClass::Refinery)
            .job(smelt)
            .job(bulk_smelt)
            .credits(fixed_int(100)),
    );
    b.register_business(
        BusinessDefinition::new("fabricator", OwnerKind::Group)
            .facility(FacilityClass::Production)
            .job(fabricate)
            .job(ration)
            .credits(fixed_int(60)),
    );
    b.register_business(
        BusinessDefinition::new("hauling_company", OwnerKind::Individual)
            .hull("ore_hauler")
            .credits(fixed_int(20)),
    );
    b.build().unwrap()
}

// ===========================================================================
// World builders
// ===========================================================================

/// A market listing every category the helper catalogs trade in.
pub fn standard_market(supply: i32, price: i32) -> Market {
    let mut market = Market::new();
    for category in [
        MarketCategory::Ore,
        MarketCategory::RefinedMetal,
        MarketCategory::Energy,
        MarketCategory::Food,
        MarketCategory::Water,
        MarketCategory::Industrial,
    ] {
        market.list(category, fixed_int(supply), fixed_int(price));
    }
    market
}

/// A bootstrapped colony with reserves, a market, and a refinery.
pub fn add_industrial_colony(world: &mut World, name: &str, position: Vec3, population: i32, ore: i32) -> ColonyId {
    let stock = ColonyIndustryStock::new()
        .with(StockPool::Ore, fixed_int(ore))
        .with(StockPool::Food, fixed_int(200))
        .with(StockPool::Water, fixed_int(200))
        .with(StockPool::Fuel, fixed_int(100))
        .with(StockPool::Supplies, fixed_int(100));
    let colony = world.add_colony(
        Colony::new(name, position)
            .with_population(fixed_int(population))
            .with_stock(stock)
            .with_market(standard_market(50, 2)),
    );
    world.add_facility(colony, FacilityClass::Refinery);
    world.add_facility(colony, FacilityClass::Production);
    colony
}

/// Engine with every interval set to 1, so each stage runs every tick.
pub fn every_tick_config() -> SimulationConfig {
    SimulationConfig {
        procurement_interval: 1,
        job_interval: 1,
        bridge_interval: 1,
        telemetry_cadence: 1,
        ..SimulationConfig::default()
    }
}

pub fn engine_with(catalog: Catalog, config: SimulationConfig) -> Engine {
    Engine::new(Arc::new(catalog), config)
}

/// Economy engine with `colonies` industrial colonies laid out on a line.
pub fn populated_engine(colonies: usize, config: SimulationConfig) -> Engine {
    let mut engine = engine_with(economy_catalog(), config);
    let world = engine.world_mut();
    let faction = world.add_faction("Union", None);
    for i in 0..colonies {
        let position = Vec3::new(i as f32 * 100.0, 0.0, 0.0);
        let colony = add_industrial_colony(world, &format!("colony-{i}"), position, 10_000, 40);
        world.colonies[colony].faction = Some(faction);
    }
    engine
}

// ===========================================================================
// Stepping
// ===========================================================================

/// Step ticks `from..from + count` with one second per tick.
pub fn run_ticks(engine: &mut Engine, from: Ticks, count: Ticks) -> Vec<StepResult> {
    (from..from + count)
        .map(|tick| engine.step(&TickClock::new(tick, 1.0)))
        .collect()
}
