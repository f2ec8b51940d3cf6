//! The economy engine: owns the world and runs the per-tick stage pipeline.
//!
//! # Pipeline
//!
//! Each `step()` runs, in order:
//! 1. **Spawn** -- create businesses for new colonies; seed starter fleets
//! 2. **Feed** -- population generation and consumption of colony reserves
//! 3. **Tech** -- recompute research unlocks from tech levels
//! 4. **Procurement** -- top up business inputs (interval-gated)
//! 5. **Jobs** -- finish due jobs; start new ones (interval-gated)
//! 6. **Bridge** -- export business surplus (interval-gated)
//! 7. **Export** -- parked carriers unload into nearby colony reserves
//! 8. **Haulers** -- move bulk cargo from carriers to colonies
//! 9. **Propagation** -- prune dead ownership links; apply unlocks to dependents
//! 10. **Bookkeeping** -- telemetry, tick bookkeeping, state hash
//!
//! Stages run one after another and never overlap, since procurement, jobs,
//! and the bridge all write business ledgers and colony reserves.

use std::fmt;
use std::sync::Arc;

use crate::bridge::run_market_bridge;
use crate::catalog::Catalog;
use crate::config::{SimulationConfig, is_due};
use crate::event::{EconomyEvent, EventLog};
use crate::export::run_export;
use crate::feed::feed_colonies;
use crate::fixed::{Fixed64, Ticks, fixed64_to_f64};
use crate::hauler::{HaulerPhase, run_haulers};
use crate::id::{AssetRef, BusinessId};
use crate::ledger::Ledger;
use crate::ownership::AssignOutcome;
use crate::procurement::run_procurement;
use crate::profiling::BusinessDiagnostic;
use crate::scheduler::{OpenStanding, StandingGate, check_candidate, run_jobs};
use crate::sim::{SimState, StateHash, StepResult, TickClock};
use crate::spawn::{seed_fleets, spawn_businesses};
use crate::tech;
use crate::telemetry::{self, TelemetrySink, is_telemetry_tick};
use crate::world::World;
use log::debug;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    catalog: Arc<Catalog>,
    config: SimulationConfig,
    world: World,
    /// Tick bookkeeping.
    pub sim_state: SimState,
    events: EventLog,
    standing: Box<dyn StandingGate>,
    telemetry: Option<Box<dyn TelemetrySink>>,
    /// Hauler deliveries accumulated since the last telemetry tick.
    delivered_since_report: Fixed64,
    last_state_hash: u64,
    #[cfg(feature = "profiling")]
    last_profile: Option<crate::profiling::StageProfile>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("sim_state", &self.sim_state)
            .field("businesses", &self.world.businesses.len())
            .field("colonies", &self.world.colonies.len())
            .field("pending_events", &self.events.len())
            .field("telemetry", &self.telemetry.is_some())
            .field("last_state_hash", &self.last_state_hash)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>, config: SimulationConfig) -> Self {
        Self {
            catalog,
            config,
            world: World::new(),
            sim_state: SimState::new(),
            events: EventLog::new(),
            standing: Box::new(OpenStanding),
            telemetry: None,
            delivered_since_report: Fixed64::ZERO,
            last_state_hash: 0,
            #[cfg(feature = "profiling")]
            last_profile: None,
        }
    }

    /// Replace the reputation check used by standing-gated jobs.
    pub fn with_standing_gate(mut self, gate: impl StandingGate + 'static) -> Self {
        self.standing = Box::new(gate);
        self
    }

    pub fn set_telemetry(&mut self, sink: Box<dyn TelemetrySink>) {
        self.telemetry = Some(sink);
    }

    pub fn take_telemetry(&mut self) -> Option<Box<dyn TelemetrySink>> {
        self.telemetry.take()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn events(&self) -> &[EconomyEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<EconomyEvent> {
        self.events.drain()
    }

    /// Event log access, for suppressing event kinds.
    pub fn event_log_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// Assign an asset to a business at the current tick.
    pub fn assign_asset(&mut self, business: BusinessId, asset: AssetRef, catalog_id: &str) -> AssignOutcome {
        let tick = self.sim_state.last_tick.unwrap_or(0);
        self.world.ownership.assign(business, asset, tick, catalog_id)
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance the economy by one tick. Paused clocks and a disabled economy
    /// leave every piece of state untouched.
    pub fn step(&mut self, clock: &TickClock) -> StepResult {
        let now = clock.tick_number;
        if clock.is_paused || !self.config.enable_economy {
            return StepResult {
                ran: false,
                tick: now,
                state_hash: self.last_state_hash,
                ..StepResult::default()
            };
        }
        let dt = clock.scaled_delta();
        let mut result = StepResult {
            ran: true,
            tick: now,
            ..StepResult::default()
        };

        #[cfg(feature = "profiling")]
        let step_start = std::time::Instant::now();

        // Stage 1: Spawn.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        result.businesses_spawned = spawn_businesses(&mut self.world, &self.catalog, now, &mut self.events);
        seed_fleets(&mut self.world, &self.catalog, now, &mut self.events);
        #[cfg(feature = "profiling")]
        let spawn_dur = stage_start.elapsed();

        // Stage 2: Feed.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        let shortfall = feed_colonies(&mut self.world, &self.config.feed, dt);
        #[cfg(feature = "profiling")]
        let feed_dur = stage_start.elapsed();

        // Stage 3: Tech.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        tech::recompute_unlocks(&mut self.world);
        #[cfg(feature = "profiling")]
        let tech_dur = stage_start.elapsed();

        // Stage 4: Procurement.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        if is_due(self.config.procurement_interval, now) {
            run_procurement(&mut self.world, &self.catalog, &self.config, now, &mut self.events);
        }
        #[cfg(feature = "profiling")]
        let procurement_dur = stage_start.elapsed();

        // Stage 5: Jobs.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        let jobs = run_jobs(
            &mut self.world,
            &self.catalog,
            &self.config,
            self.standing.as_ref(),
            now,
            &mut self.events,
        );
        result.jobs_started = jobs.started;
        result.jobs_completed = jobs.completed;
        #[cfg(feature = "profiling")]
        let jobs_dur = stage_start.elapsed();

        // Stage 6: Bridge.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        if is_due(self.config.bridge_interval, now) {
            run_market_bridge(&mut self.world, &self.catalog, &self.config, now, &mut self.events);
        }
        #[cfg(feature = "profiling")]
        let bridge_dur = stage_start.elapsed();

        // Stage 7: Export.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        let exported = run_export(
            &mut self.world,
            &self.catalog,
            &self.config.export,
            dt,
            now,
            &mut self.events,
        );
        result.carrier_exports = exported.carriers;
        #[cfg(feature = "profiling")]
        let export_dur = stage_start.elapsed();

        // Stage 8: Haulers.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        let hauled = run_haulers(
            &mut self.world,
            &self.catalog,
            &self.config.hauler,
            dt,
            now,
            &mut self.events,
        );
        result.haulers_delivered = hauled.deliveries;
        self.delivered_since_report = self.delivered_since_report.saturating_add(hauled.delivered);
        #[cfg(feature = "profiling")]
        let haulers_dur = stage_start.elapsed();

        // Stage 9: Propagation.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        let pruned = self.world.prune_ownership();
        if pruned > 0 {
            debug!("pruned {pruned} stale ownership links");
        }
        tech::propagate(&mut self.world);
        #[cfg(feature = "profiling")]
        let propagation_dur = stage_start.elapsed();

        // Stage 10: Bookkeeping.
        #[cfg(feature = "profiling")]
        let stage_start = std::time::Instant::now();
        if is_telemetry_tick(self.config.telemetry_cadence, now) {
            if let Some(sink) = self.telemetry.as_deref_mut() {
                sink.begin_tick(now);
                sink.record(telemetry::HAULER_DELIVERED, fixed64_to_f64(self.delivered_since_report));
                shortfall.report(sink);
            }
            self.delivered_since_report = Fixed64::ZERO;
        }
        self.sim_state.last_tick = Some(now);
        self.sim_state.steps_run += 1;
        self.last_state_hash = self.compute_state_hash();
        result.state_hash = self.last_state_hash;
        #[cfg(feature = "profiling")]
        let bookkeeping_dur = stage_start.elapsed();

        #[cfg(feature = "profiling")]
        {
            self.last_profile = Some(crate::profiling::StageProfile {
                spawn: spawn_dur,
                feed: feed_dur,
                tech: tech_dur,
                procurement: procurement_dur,
                jobs: jobs_dur,
                bridge: bridge_dur,
                export: export_dur,
                haulers: haulers_dur,
                propagation: propagation_dur,
                bookkeeping: bookkeeping_dur,
                total: step_start.elapsed(),
                tick: now,
            });
        }

        result
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Hash of the most recent step, or 0 before the first step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Hash business state, ledgers, reserves, markets, carriers, and
    /// haulers. Entities are visited in slot order.
    pub fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.last_tick.unwrap_or(0));

        for (_, business) in &self.world.businesses {
            hasher.write_u32(business.kind.0);
            hasher.write_fixed64(business.credits);
            hasher.write_u64(business.last_job_tick);
            hasher.write_u64(business.next_job_tick);
            match business.active_job {
                Some(active) => {
                    hasher.write_u32(active.job.0);
                    hasher.write_u64(active.completes_tick);
                }
                None => hasher.write_u32(u32::MAX),
            }
            hash_ledger(&mut hasher, &business.ledger);
        }

        for (_, colony) in &self.world.colonies {
            if let Some(stock) = &colony.stock {
                for pool in crate::stock::StockPool::ALL {
                    hasher.write_fixed64(stock.get(pool));
                }
            }
            if let Some(market) = &colony.market {
                for entry in market.entries() {
                    hasher.write_fixed64(entry.supply);
                }
            }
        }

        for (_, carrier) in &self.world.carriers {
            hash_ledger(&mut hasher, &carrier.cargo);
        }

        for (_, hauler) in &self.world.haulers {
            hasher.write_f32(hauler.position.x);
            hasher.write_f32(hauler.position.y);
            hasher.write_f32(hauler.position.z);
            hasher.write_u32(match hauler.phase {
                HaulerPhase::Idle => 0,
                HaulerPhase::ToCarrier => 1,
                HaulerPhase::ToColony => 2,
            });
            hash_ledger(&mut hasher, &hauler.cargo);
        }

        hasher.finish()
    }

    // -----------------------------------------------------------------------
    // Profiling / Diagnostics
    // -----------------------------------------------------------------------

    /// Timing profile from the most recent step.
    /// Only available with the `profiling` feature.
    #[cfg(feature = "profiling")]
    pub fn last_stage_profile(&self) -> Option<&crate::profiling::StageProfile> {
        self.last_profile.as_ref()
    }

    /// Explain a business's scheduling state: its active job and, for every
    /// job it may run, the first filter that job fails right now.
    pub fn diagnose_business(&self, id: BusinessId) -> Option<BusinessDiagnostic> {
        let business = self.world.businesses.get(id)?;
        let candidates = self
            .catalog
            .jobs_for(business.kind)
            .map(|(job_id, job)| {
                (
                    job_id,
                    check_candidate(&self.world, self.standing.as_ref(), id, business, job),
                )
            })
            .collect();
        Some(BusinessDiagnostic {
            business: id,
            active_job: business.active_job,
            last_job_tick: business.last_job_tick,
            next_job_tick: business.next_job_tick,
            credits: business.credits,
            candidates,
        })
    }
}

fn hash_ledger(hasher: &mut StateHash, ledger: &Ledger) {
    for entry in ledger.entries() {
        hasher.write_u32(entry.resource.0);
        hasher.write_fixed64(entry.amount);
        hasher.write_fixed64(entry.reserved);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
