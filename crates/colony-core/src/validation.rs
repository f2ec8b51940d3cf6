//! Invariant checks and determinism validation.
//!
//! [`check_invariants`] walks a world and reports every broken storage or
//! scheduling invariant; [`validate_determinism`] runs two engines built by
//! the same factory side by side and compares their state hashes.

use crate::engine::Engine;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{BusinessId, CarrierId, ColonyId, HaulerId};
use crate::sim::TickClock;
use crate::world::World;

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A business ledger entry is negative, over capacity, or over-reserved.
    BusinessLedger(BusinessId),
    CarrierCargo(CarrierId),
    HaulerCargo(HaulerId),
    HaulerOverCapacity(HaulerId),
    ColonyStock(ColonyId),
    NegativeCredits(BusinessId),
    /// `next_job_tick` fell behind `last_job_tick`.
    JobTickOrder(BusinessId),
    /// An asset is linked to two businesses, or the reverse index disagrees.
    Ownership,
}

/// Every invariant violation in `world`, in a stable order.
pub fn check_invariants(world: &World) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (id, business) in &world.businesses {
        if !business.ledger.is_consistent() {
            violations.push(Violation::BusinessLedger(id));
        }
        if business.credits < Fixed64::ZERO {
            violations.push(Violation::NegativeCredits(id));
        }
        if business.next_job_tick < business.last_job_tick {
            violations.push(Violation::JobTickOrder(id));
        }
    }
    for (id, carrier) in &world.carriers {
        if !carrier.cargo.is_consistent() {
            violations.push(Violation::CarrierCargo(id));
        }
    }
    for (id, hauler) in &world.haulers {
        if !hauler.cargo.is_consistent() {
            violations.push(Violation::HaulerCargo(id));
        }
        if hauler.load() > hauler.capacity {
            violations.push(Violation::HaulerOverCapacity(id));
        }
    }
    for (id, colony) in &world.colonies {
        if colony.stock.as_ref().is_some_and(|s| !s.is_consistent()) {
            violations.push(Violation::ColonyStock(id));
        }
    }
    if !world.ownership.is_consistent() {
        violations.push(Violation::Ownership);
    }
    violations
}

/// Units held anywhere: ledgers, cargo holds, colony reserves, and market
/// supply. Procurement, the bridge, and haulers move units without changing
/// this total; jobs, feed, and overflow clamping do change it.
pub fn total_units(world: &World) -> Fixed64 {
    let mut total = Fixed64::ZERO;
    for business in world.businesses.values() {
        total = total.saturating_add(business.ledger.total());
    }
    for carrier in world.carriers.values() {
        total = total.saturating_add(carrier.cargo.total());
    }
    for hauler in world.haulers.values() {
        total = total.saturating_add(hauler.cargo.total());
    }
    for colony in world.colonies.values() {
        if let Some(stock) = &colony.stock {
            total = total.saturating_add(stock.total());
        }
        if let Some(market) = &colony.market {
            total = total.saturating_add(market.total_supply());
        }
    }
    total
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    /// Whether the two runs produced identical results.
    pub is_deterministic: bool,
    /// Tick at which divergence was first detected (if any).
    pub divergence_tick: Option<Ticks>,
    /// Hash log: (tick, hash_run1, hash_run2) for each tick.
    pub hash_log: Vec<(Ticks, u64, u64)>,
}

/// Build two engines with `make` and step both through ticks `0..ticks`
/// with one second per tick.
pub fn validate_determinism(make: impl Fn() -> Engine, ticks: Ticks) -> DeterminismResult {
    let mut engine_a = make();
    let mut engine_b = make();

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;

    for tick in 0..ticks {
        let clock = TickClock::new(tick, 1.0);
        let hash_a = engine_a.step(&clock).state_hash;
        let hash_b = engine_b.step(&clock).state_hash;

        hash_log.push((tick, hash_a, hash_b));

        if hash_a != hash_b && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
