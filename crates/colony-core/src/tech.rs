//! Research tiers, derived unlocks, and their propagation onto dependents.
//!
//! [`ResearchUnlocks`] is a pure function of a colony's [`TechLevel`] and is
//! recomputed every tick. Facility queue capacity is written straight from it.
//! Crew training, carrier mining and salvage hold a [`Baselined`] value: the
//! first time propagation sees a record it captures the current value as the
//! baseline, and every later application derives the live value from that
//! baseline, so repeated application never compounds.

use crate::fixed::{Fixed64, fixed_int, fixed_ratio};
use crate::id::{CarrierId, ColonyId};
use crate::world::World;
use serde::{Deserialize, Serialize};

const TENTH: Fixed64 = fixed_ratio(1, 10);
const TWENTIETH: Fixed64 = fixed_ratio(1, 20);
const FIFTIETH: Fixed64 = fixed_ratio(1, 50);
const MAX_BIONICS_BONUS: Fixed64 = fixed_ratio(1, 5);

const SALVAGE_SPEED_STEP: Fixed64 = fixed_ratio(5, 100);
const SALVAGE_RISK_STEP: Fixed64 = fixed_ratio(3, 100);
const SALVAGE_YIELD_STEP: Fixed64 = fixed_ratio(4, 100);
const MAX_SALVAGE_SPEED: Fixed64 = fixed_int(2);
const MAX_RISK_REDUCTION: Fixed64 = fixed_ratio(9, 10);
const MAX_SALVAGE_YIELD: Fixed64 = fixed_int(1);

/// Salvage tier at which wrecks can be reactivated.
pub const REACTIVATION_TIER: u8 = 2;

/// Per-colony research tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechLevel {
    pub mining: u8,
    pub combat: u8,
    pub hauling: u8,
    pub processing: u8,
}

impl TechLevel {
    /// Tier compared against a job's minimum tech gate.
    pub fn highest(&self) -> u8 {
        self.mining
            .max(self.combat)
            .max(self.hauling)
            .max(self.processing)
    }
}

/// Values derived from a [`TechLevel`]. Never mutated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchUnlocks {
    pub production_tier: u8,
    pub processing_tier: u8,
    pub extraction_tier: u8,
    pub throughput_scalar: Fixed64,
    pub production_queue_slots: u8,
    pub extraction_scalar: Fixed64,
    pub salvage_tier: u8,
    pub training_scalar: Fixed64,
    pub bionics_bonus: Fixed64,
}

impl Default for ResearchUnlocks {
    fn default() -> Self {
        Self::from_tech(&TechLevel::default())
    }
}

impl ResearchUnlocks {
    pub fn from_tech(tech: &TechLevel) -> Self {
        let one = fixed_int(1);
        let processing = Fixed64::from_num(tech.processing);
        let mining = Fixed64::from_num(tech.mining);
        let combat = Fixed64::from_num(tech.combat);

        Self {
            production_tier: tech.processing.max(tech.mining),
            processing_tier: tech.processing,
            extraction_tier: tech.mining,
            throughput_scalar: one + processing * TENTH,
            production_queue_slots: 1 + tech.processing / 2,
            extraction_scalar: one + mining * TENTH,
            salvage_tier: ((u16::from(tech.hauling) + u16::from(tech.combat)) / 2) as u8,
            training_scalar: one + combat * TWENTIETH,
            bionics_bonus: (processing * FIFTIETH).min(MAX_BIONICS_BONUS),
        }
    }
}

/// A value plus the baseline captured the first time tech was applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baselined<T> {
    pub current: T,
    baseline: Option<T>,
}

impl<T: Clone> Baselined<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            baseline: None,
        }
    }

    /// The captured baseline, or the current value if none was captured yet.
    pub fn baseline(&self) -> &T {
        self.baseline.as_ref().unwrap_or(&self.current)
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Recompute the live value from the baseline.
    pub fn apply(&mut self, derive: impl FnOnce(&T) -> T) {
        if self.baseline.is_none() {
            self.baseline = Some(self.current.clone());
        }
        if let Some(base) = &self.baseline {
            self.current = derive(base);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewTraining {
    pub rate_per_tick: Fixed64,
    pub max_training: Fixed64,
}

impl Default for CrewTraining {
    /// Untrained crew: 0.0003 per tick, capped at 0.85.
    fn default() -> Self {
        Self {
            rate_per_tick: fixed_ratio(3, 10_000),
            max_training: fixed_ratio(85, 100),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalvageCapability {
    pub speed_bonus: Fixed64,
    pub risk_reduction: Fixed64,
    pub yield_bonus: Fixed64,
    pub can_reactivate: bool,
}

fn apply_training(base: &CrewTraining, unlocks: &ResearchUnlocks) -> CrewTraining {
    // Bionics raise the cap up to 1 but never below the baseline.
    let ceiling = fixed_int(1).max(base.max_training);
    CrewTraining {
        rate_per_tick: base.rate_per_tick.saturating_mul(unlocks.training_scalar),
        max_training: (base.max_training + unlocks.bionics_bonus)
            .min(ceiling)
            .max(base.max_training),
    }
}

fn apply_salvage(base: &SalvageCapability, unlocks: &ResearchUnlocks) -> SalvageCapability {
    let tier = Fixed64::from_num(unlocks.salvage_tier);
    SalvageCapability {
        speed_bonus: (base.speed_bonus + tier * SALVAGE_SPEED_STEP)
            .clamp(Fixed64::ZERO, MAX_SALVAGE_SPEED),
        risk_reduction: (base.risk_reduction + tier * SALVAGE_RISK_STEP)
            .clamp(Fixed64::ZERO, MAX_RISK_REDUCTION),
        yield_bonus: (base.yield_bonus + tier * SALVAGE_YIELD_STEP)
            .clamp(Fixed64::ZERO, MAX_SALVAGE_YIELD),
        can_reactivate: base.can_reactivate || unlocks.salvage_tier >= REACTIVATION_TIER,
    }
}

/// Recompute every colony's unlock record from its tech level.
pub fn recompute_unlocks(world: &mut World) {
    for colony in world.colonies.values_mut() {
        colony.unlocks = ResearchUnlocks::from_tech(&colony.tech);
    }
}

/// Colony whose research applies to a carrier: its home colony, else the
/// colony of the business that owns it.
pub fn carrier_colony(world: &World, carrier: CarrierId) -> Option<ColonyId> {
    let record = world.carriers.get(carrier)?;
    if let Some(home) = record.home_colony.filter(|c| world.colonies.contains_key(*c)) {
        return Some(home);
    }
    let business = world.ownership.owner_of(crate::id::AssetRef::Ship(carrier))?;
    let colony = world.businesses.get(business)?.colony;
    world.colonies.contains_key(colony).then_some(colony)
}

/// Apply current unlocks onto facilities and carriers.
///
/// Queue capacity is set straight from the unlock record. Training, mining
/// and salvage derive from their captured baselines.
pub fn propagate(world: &mut World) {
    for facility in world.facilities.values_mut() {
        let Some(colony) = world.colonies.get(facility.colony) else {
            continue;
        };
        let unlocks = colony.unlocks;
        facility.queue_capacity = Some(unlocks.production_queue_slots);
        facility.training.apply(|base| apply_training(base, &unlocks));
    }

    let carrier_ids: Vec<CarrierId> = world.carriers.keys().collect();
    for id in carrier_ids {
        let Some(colony) = carrier_colony(world, id) else {
            continue;
        };
        let Some(unlocks) = world.colonies.get(colony).map(|c| c.unlocks) else {
            continue;
        };
        let Some(carrier) = world.carriers.get_mut(id) else {
            continue;
        };
        carrier
            .mining_efficiency
            .apply(|base| base.saturating_mul(unlocks.extraction_scalar));
        carrier.salvage.apply(|base| apply_salvage(base, &unlocks));
    }
}
