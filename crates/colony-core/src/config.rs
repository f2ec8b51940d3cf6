//! Simulation configuration threaded through every stage.
//!
//! Values are plain numbers so configuration files stay readable; stages
//! convert them to [`Fixed64`] once per use. An interval of `0` disables the
//! stage it gates.

use crate::fixed::{Fixed64, Ticks, f64_to_fixed64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master switch. When false every step is a no-op.
    pub enable_economy: bool,
    pub procurement_interval: Ticks,
    pub job_interval: Ticks,
    pub bridge_interval: Ticks,
    /// Most units procurement moves per resource per business per run.
    pub max_procure_per_tick: f64,
    /// Job cycles of input procurement tries to keep on hand.
    pub desired_cycles: f64,
    /// Most units the market bridge exports per resource per business per run.
    pub max_transfer_per_tick: f64,
    /// Ticks between telemetry emissions. 0 disables telemetry.
    pub telemetry_cadence: Ticks,
    pub feed: FeedConfig,
    pub hauler: HaulerConfig,
    pub export: ExportConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enable_economy: true,
            procurement_interval: 10,
            job_interval: 10,
            bridge_interval: 10,
            max_procure_per_tick: 6.0,
            desired_cycles: 2.0,
            max_transfer_per_tick: 4.0,
            telemetry_cadence: 30,
            feed: FeedConfig::default(),
            hauler: HaulerConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn max_procure(&self) -> Fixed64 {
        f64_to_fixed64(self.max_procure_per_tick.max(0.0))
    }

    pub fn desired_multiplier(&self) -> Fixed64 {
        f64_to_fixed64(self.desired_cycles.max(0.0))
    }

    pub fn max_transfer(&self) -> Fixed64 {
        f64_to_fixed64(self.max_transfer_per_tick.max(0.0))
    }
}

/// Whether a stage gated by `interval` runs on `tick`.
pub fn is_due(interval: Ticks, tick: Ticks) -> bool {
    interval != 0 && tick % interval == 0
}

/// Per-capita, per-second colony generation and consumption rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub ore_per_pop: f64,
    pub supplies_per_pop: f64,
    pub research_per_pop: f64,
    pub food_use_per_pop: f64,
    pub water_use_per_pop: f64,
    pub fuel_use_per_pop: f64,
    pub supplies_use_per_pop: f64,
    /// Floor on the essentials demand used for shortfall telemetry.
    pub min_essentials_demand: f64,
    /// Essentials demand per capita.
    pub essentials_per_pop: f64,
    /// Share of the essentials demand each staple should cover.
    pub essentials_share: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ore_per_pop: 0.0005,
            supplies_per_pop: 0.00025,
            research_per_pop: 0.00005,
            food_use_per_pop: 0.0003,
            water_use_per_pop: 0.0003,
            fuel_use_per_pop: 0.00015,
            supplies_use_per_pop: 0.0001,
            min_essentials_demand: 200.0,
            essentials_per_pop: 0.002,
            essentials_share: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaulerConfig {
    /// World units per second.
    pub speed: f32,
    pub pickup_radius: f32,
    pub dropoff_radius: f32,
    /// Units moved from a carrier into the hauler per second while docked.
    pub transfer_rate_per_second: f64,
    /// Carriers holding less total cargo than this are ignored.
    pub min_carrier_load: f64,
}

impl Default for HaulerConfig {
    fn default() -> Self {
        Self {
            speed: 30.0,
            pickup_radius: 5.0,
            dropoff_radius: 5.0,
            transfer_rate_per_second: 60.0,
            min_carrier_load: 10.0,
        }
    }
}

/// Direct carrier-to-colony unloading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Units a carrier unloads per second. 0 disables the stage.
    pub transfer_rate_per_second: f64,
    /// Farthest a colony may be from the carrier. 0 means unlimited.
    pub max_transfer_distance: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            transfer_rate_per_second: 20.0,
            max_transfer_distance: 15.0,
        }
    }
}

impl ExportConfig {
    /// Units one carrier may unload during a step of `dt` seconds.
    pub fn budget(&self, dt: f32) -> Fixed64 {
        f64_to_fixed64(self.transfer_rate_per_second.max(0.0) * f64::from(dt.max(0.0)))
    }

    /// Whether a colony `distance` away is close enough to receive cargo.
    pub fn in_range(&self, distance: f32) -> bool {
        self.max_transfer_distance <= 0.0 || distance <= self.max_transfer_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SimulationConfig::default();
        assert!(config.enable_economy);
        assert_eq!(config.job_interval, 10);
        assert_eq!(config.max_procure(), Fixed64::from_num(6));
        assert_eq!(config.desired_multiplier(), Fixed64::from_num(2));
        assert_eq!(config.max_transfer(), Fixed64::from_num(4));
        assert_eq!(config.hauler.speed, 30.0);
        assert_eq!(config.export.budget(1.0), Fixed64::from_num(20));
    }

    #[test]
    fn zero_export_distance_is_unlimited() {
        let mut export = ExportConfig::default();
        assert!(export.in_range(15.0));
        assert!(!export.in_range(15.5));
        export.max_transfer_distance = 0.0;
        assert!(export.in_range(1.0e6));
        assert_eq!(export.budget(-1.0), Fixed64::ZERO);
    }

    #[test]
    fn zero_interval_disables() {
        assert!(!is_due(0, 0));
        assert!(!is_due(0, 10));
        assert!(is_due(10, 0));
        assert!(is_due(10, 20));
        assert!(!is_due(10, 25));
        assert!(is_due(1, 7));
    }

    #[test]
    fn negative_caps_clamp_to_zero() {
        let config = SimulationConfig {
            max_procure_per_tick: -3.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.max_procure(), Fixed64::ZERO);
    }
}
