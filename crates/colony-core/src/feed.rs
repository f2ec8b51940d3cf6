//! Population-driven colony generation and consumption.

use crate::config::FeedConfig;
use crate::fixed::{Fixed64, f64_to_fixed64, fixed64_to_f64, non_negative};
use crate::stock::StockPool;
use crate::telemetry::{self, TelemetrySink};
use crate::world::World;
use log::trace;

/// Summed shortfall of each staple against desired reserves, across colonies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shortfall {
    pub food: Fixed64,
    pub water: Fixed64,
    pub fuel: Fixed64,
    pub supplies: Fixed64,
}

impl Shortfall {
    pub fn essentials(&self) -> Fixed64 {
        self.food
            .saturating_add(self.water)
            .saturating_add(self.fuel)
            .saturating_add(self.supplies)
    }

    pub fn any(&self) -> bool {
        self.essentials() > Fixed64::ZERO
    }

    /// Report the shortfall metrics. Nothing is reported when every staple
    /// is covered.
    pub fn report(&self, sink: &mut dyn TelemetrySink) {
        if !self.any() {
            return;
        }
        sink.record(telemetry::SHORTFALL_FOOD, fixed64_to_f64(self.food));
        sink.record(telemetry::SHORTFALL_WATER, fixed64_to_f64(self.water));
        sink.record(telemetry::SHORTFALL_FUEL, fixed64_to_f64(self.fuel));
        sink.record(telemetry::SHORTFALL_SUPPLIES, fixed64_to_f64(self.supplies));
        sink.record(telemetry::SHORTFALL_ESSENTIALS, fixed64_to_f64(self.essentials()));
    }
}

fn per_tick(rate: f64, dt: f32) -> Fixed64 {
    f64_to_fixed64(rate.max(0.0) * f64::from(dt.max(0.0)))
}

/// Grow and drain every bootstrapped colony's stock by `dt` seconds of
/// population activity.
pub fn feed_colonies(world: &mut World, config: &FeedConfig, dt: f32) -> Shortfall {
    let ore_rate = per_tick(config.ore_per_pop, dt);
    let supplies_rate = per_tick(config.supplies_per_pop, dt);
    let research_rate = per_tick(config.research_per_pop, dt);
    let food_use = per_tick(config.food_use_per_pop, dt);
    let water_use = per_tick(config.water_use_per_pop, dt);
    let fuel_use = per_tick(config.fuel_use_per_pop, dt);
    let supplies_use = per_tick(config.supplies_use_per_pop, dt);
    let min_demand = f64_to_fixed64(config.min_essentials_demand.max(0.0));
    let demand_per_pop = f64_to_fixed64(config.essentials_per_pop.max(0.0));
    let share = f64_to_fixed64(config.essentials_share.max(0.0));

    let mut shortfall = Shortfall::default();
    for colony in world.colonies.values_mut() {
        let population = non_negative(colony.population);
        let Some(stock) = colony.stock.as_mut() else {
            continue;
        };

        stock.deposit(StockPool::Ore, population.saturating_mul(ore_rate));
        stock.deposit(StockPool::Supplies, population.saturating_mul(supplies_rate));
        stock.deposit(StockPool::Research, population.saturating_mul(research_rate));
        stock.consume(StockPool::Food, population.saturating_mul(food_use));
        stock.consume(StockPool::Water, population.saturating_mul(water_use));
        stock.consume(StockPool::Fuel, population.saturating_mul(fuel_use));
        stock.consume(StockPool::Supplies, population.saturating_mul(supplies_use));

        let desired = min_demand.max(population.saturating_mul(demand_per_pop));
        let per_essential = desired.saturating_mul(share);
        shortfall.food += non_negative(per_essential - stock.food);
        shortfall.water += non_negative(per_essential - stock.water);
        shortfall.fuel += non_negative(per_essential - stock.fuel);
        shortfall.supplies += non_negative(per_essential - stock.supplies);
        trace!("fed colony {}: stock total {}", colony.name, stock.total());
    }
    shortfall
}
