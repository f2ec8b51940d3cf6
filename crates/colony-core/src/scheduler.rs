//! Job scheduling and execution.
//!
//! A business is either idle or running exactly one job. Starting a job
//! reserves its inputs; on the completion tick the reserved inputs are
//! consumed and the outputs deposited in one step. Outputs that do not fit
//! leave the job stalled in place until room appears.
//!
//! Candidate evaluation reads the world only, so with the `parallel` feature
//! it runs on the rayon pool. Chosen jobs are applied afterwards in business
//! key order either way.

use crate::catalog::{Catalog, JobDefinition};
use crate::config::{SimulationConfig, is_due};
use crate::event::{EconomyEvent, EventLog};
use crate::fixed::{Fixed64, Ticks, checked_div_64, fixed_ratio, non_negative};
use crate::id::{BusinessId, FactionId, JobId, OwnerRef, ResourceTypeId};
use crate::tech::ResearchUnlocks;
use crate::world::{ActiveJob, BusinessState, JobRoleAssignment, World};
use log::{debug, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Reputation check consulted for jobs with a standing gate.
pub trait StandingGate: Send + Sync {
    fn passes_standing_gate(&self, actor: BusinessId, faction: FactionId, threshold: Fixed64) -> bool;
}

/// A gate that lets every actor through.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenStanding;

impl StandingGate for OpenStanding {
    fn passes_standing_gate(&self, _actor: BusinessId, _faction: FactionId, _threshold: Fixed64) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub started: u32,
    pub completed: u32,
    pub stalled: u32,
    pub no_candidate: u32,
}

/// Slack absorbed before rounding a scaled duration up, so truncated
/// scalars like 1.9999999 behave as 2.
const DURATION_ROUNDING_SLACK: Fixed64 = fixed_ratio(1, 1000);

/// Ticks a job takes at the given research level. Never less than one.
pub fn effective_duration(duration: Ticks, unlocks: &ResearchUnlocks) -> Ticks {
    let base = Fixed64::saturating_from_num(duration);
    let scaled = match checked_div_64(base, unlocks.throughput_scalar) {
        Some(v) if unlocks.throughput_scalar > Fixed64::ZERO => v,
        _ => base,
    };
    let ticks = non_negative(scaled - DURATION_ROUNDING_SLACK).ceil();
    ticks.to_num::<u64>().max(1)
}

fn facility_ok(world: &World, business: &BusinessState, job: &JobDefinition) -> bool {
    let Some(class) = job.required_facility else {
        return true;
    };
    let own = business.facility_class == Some(class)
        && business.facility.is_some_and(|f| world.facilities.contains_key(f));
    own || world.colony_has_facility(business.colony, class)
}

/// Why a job cannot start for a business right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBlock {
    UnknownColony,
    NotSchedulable,
    MissingFacility,
    TechTier { have: u8, need: u8 },
    Standing,
    MissingInput(ResourceTypeId),
    OutputFull(ResourceTypeId),
}

/// Run the candidate filter in order: facility, tech, standing, inputs,
/// output room.
pub fn check_candidate(
    world: &World,
    gate: &dyn StandingGate,
    id: BusinessId,
    business: &BusinessState,
    job: &JobDefinition,
) -> Result<(), JobBlock> {
    let Some(colony) = world.colonies.get(business.colony) else {
        return Err(JobBlock::UnknownColony);
    };
    if !job.is_schedulable() {
        return Err(JobBlock::NotSchedulable);
    }
    if !facility_ok(world, business, job) {
        return Err(JobBlock::MissingFacility);
    }
    let have = colony.tech.highest();
    if have < job.min_tech_tier {
        return Err(JobBlock::TechTier {
            have,
            need: job.min_tech_tier,
        });
    }
    if job.standing_gate > Fixed64::ZERO {
        if let Some(faction) = colony.faction {
            if !gate.passes_standing_gate(id, faction, job.standing_gate) {
                return Err(JobBlock::Standing);
            }
        }
    }
    if let Some(missing) = job
        .inputs
        .iter()
        .find(|e| !business.ledger.has_available(e.resource, e.units))
    {
        return Err(JobBlock::MissingInput(missing.resource));
    }
    if let Some(full) = job
        .outputs
        .iter()
        .find(|e| business.ledger.headroom(e.resource) < e.units)
    {
        return Err(JobBlock::OutputFull(full.resource));
    }
    Ok(())
}

/// Highest-scoring job the business can start now. Ties keep the job listed
/// first for the business kind.
pub fn select_job(
    world: &World,
    catalog: &Catalog,
    gate: &dyn StandingGate,
    id: BusinessId,
) -> Option<JobId> {
    let business = world.businesses.get(id)?;
    let mut best: Option<(JobId, Fixed64)> = None;
    for (job_id, job) in catalog.jobs_for(business.kind) {
        if check_candidate(world, gate, id, business, job).is_err() {
            continue;
        }
        let score = job.score();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((job_id, score));
        }
    }
    best.map(|(job, _)| job)
}

fn complete_jobs(world: &mut World, catalog: &Catalog, now: Ticks, events: &mut EventLog, report: &mut SchedulerReport) {
    for (id, business) in world.businesses.iter_mut() {
        let Some(active) = business.active_job else {
            continue;
        };
        if active.completes_tick > now {
            continue;
        }
        let Some(job) = catalog.job(active.job) else {
            business.ledger.release_all();
            business.active_job = None;
            continue;
        };

        let fits = job
            .outputs
            .iter()
            .all(|e| business.ledger.headroom(e.resource) >= e.units);
        if !fits {
            if !active.stalled {
                warn!("business {id:?}: outputs of {} do not fit, job stalled", job.name);
                events.emit(EconomyEvent::JobStalled {
                    business: id,
                    job: active.job,
                    tick: now,
                });
                report.stalled += 1;
            }
            business.active_job = Some(ActiveJob {
                stalled: true,
                ..active
            });
            continue;
        }

        for input in &job.inputs {
            business.ledger.consume_reserved(input.resource, input.units);
        }
        for output in &job.outputs {
            let overflow = business.ledger.add(output.resource, output.units);
            if overflow > Fixed64::ZERO {
                warn!("business {id:?}: {overflow} of {:?} over capacity", output.resource);
            }
        }
        business.active_job = None;
        debug!("business {id:?} completed {}", job.name);
        events.emit(EconomyEvent::JobCompleted {
            business: id,
            job: active.job,
            tick: now,
        });
        report.completed += 1;
    }
}

fn idle_and_due(business: &BusinessState, now: Ticks) -> bool {
    business.is_idle() && business.next_job_tick <= now
}

#[cfg(not(feature = "parallel"))]
fn evaluate(world: &World, catalog: &Catalog, gate: &dyn StandingGate, ids: &[BusinessId]) -> Vec<Option<JobId>> {
    ids.iter().map(|&id| select_job(world, catalog, gate, id)).collect()
}

#[cfg(feature = "parallel")]
fn evaluate(world: &World, catalog: &Catalog, gate: &dyn StandingGate, ids: &[BusinessId]) -> Vec<Option<JobId>> {
    ids.par_iter().map(|&id| select_job(world, catalog, gate, id)).collect()
}

fn start_job(
    world: &mut World,
    catalog: &Catalog,
    id: BusinessId,
    job_id: JobId,
    now: Ticks,
    events: &mut EventLog,
) -> bool {
    let Some(job) = catalog.job(job_id) else {
        return false;
    };
    let World {
        businesses,
        colonies,
        owners,
        ..
    } = world;
    let Some(business) = businesses.get_mut(id) else {
        return false;
    };
    let unlocks = colonies
        .get(business.colony)
        .map(|c| c.unlocks)
        .unwrap_or_default();

    let mut reserved = Vec::with_capacity(job.inputs.len());
    for input in &job.inputs {
        if !business.ledger.reserve(input.resource, input.units) {
            for &(resource, units) in &reserved {
                business.ledger.release(resource, units);
            }
            return false;
        }
        reserved.push((input.resource, input.units));
    }

    let completes_tick = now + effective_duration(job.duration, &unlocks);
    business.active_job = Some(ActiveJob {
        job: job_id,
        started_tick: now,
        completes_tick,
        stalled: false,
    });
    business.last_job_tick = now;
    business.next_job_tick = completes_tick;

    if let Some(OwnerRef::Private(owner)) = business.owner {
        if let Some(owner) = owners.get_mut(owner) {
            owner.job_role = Some(JobRoleAssignment {
                job: job_id,
                business: id,
                assigned_tick: now,
                next_evaluate_tick: completes_tick,
            });
        }
    }

    debug!("business {id:?} started {} until tick {completes_tick}", job.name);
    events.emit(EconomyEvent::JobStarted {
        business: id,
        job: job_id,
        completes_at: completes_tick,
        tick: now,
    });
    true
}

/// Finish due jobs, then start new ones for idle businesses when the job
/// interval is due.
pub fn run_jobs(
    world: &mut World,
    catalog: &Catalog,
    config: &SimulationConfig,
    gate: &dyn StandingGate,
    now: Ticks,
    events: &mut EventLog,
) -> SchedulerReport {
    let mut report = SchedulerReport::default();
    complete_jobs(world, catalog, now, events, &mut report);

    if !is_due(config.job_interval, now) {
        return report;
    }

    let ids: Vec<BusinessId> = world
        .businesses
        .iter()
        .filter(|(_, b)| idle_and_due(b, now))
        .map(|(id, _)| id)
        .collect();
    let choices = evaluate(world, catalog, gate, &ids);

    for (id, choice) in ids.into_iter().zip(choices) {
        let started = match choice {
            Some(job) => start_job(world, catalog, id, job, now, events),
            None => false,
        };
        if started {
            report.started += 1;
            continue;
        }
        let retry_at = now + config.job_interval;
        if let Some(business) = world.businesses.get_mut(id) {
            business.next_job_tick = retry_at;
        }
        trace!("business {id:?}: no candidate job, retry at {retry_at}");
        events.emit(EconomyEvent::NoCandidate {
            business: id,
            retry_at,
            tick: now,
        });
        report.no_candidate += 1;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BusinessDefinition, CatalogBuilder, ResourceDef};
    use crate::fixed::fixed_int;
    use crate::geometry::Vec3;
    use crate::id::{BusinessKindId, FacilityClass, OwnerKind};
    use crate::tech::TechLevel;
    use crate::world::{BusinessOwner, Colony};

    struct Fixture {
        world: World,
        catalog: Catalog,
        business: BusinessId,
    }

    fn fixture(extra_jobs: impl FnOnce(&mut CatalogBuilder) -> Vec<JobId>, ore: i32) -> Fixture {
        let mut b = CatalogBuilder::new();
        let ore_id = b.register_resource(ResourceDef::new("ore"));
        let ingot = b.register_resource(ResourceDef::new("ingot"));
        let smelt = b.register_job(
            JobDefinition::new("smelt", 6)
                .requires(FacilityClass::Refinery)
                .input(ore_id, fixed_int(2))
                .output(ingot, fixed_int(1)),
        );
        let mut def = BusinessDefinition::new("refinery", OwnerKind::Faction)
            .facility(FacilityClass::Refinery)
            .job(smelt);
        for job in extra_jobs(&mut b) {
            def = def.job(job);
        }
        b.register_business(def);
        let catalog = b.build().unwrap();

        let mut world = World::new();
        let colony = world.add_colony(Colony::new("Ceres", Vec3::ZERO));
        let facility = world.add_facility(colony, FacilityClass::Refinery);
        let mut state = BusinessState::new(BusinessKindId(0), OwnerKind::Faction, colony, 0);
        state.facility = Some(facility);
        state.facility_class = Some(FacilityClass::Refinery);
        let _ = state.ledger.add(ore_id, fixed_int(ore));
        let business = world.businesses.insert(state);
        Fixture {
            world,
            catalog,
            business,
        }
    }

    fn run(f: &mut Fixture, now: Ticks, events: &mut EventLog) -> SchedulerReport {
        let config = SimulationConfig {
            job_interval: 1,
            ..SimulationConfig::default()
        };
        run_jobs(&mut f.world, &f.catalog, &config, &OpenStanding, now, events)
    }

    #[test]
    fn refinery_produces_one_ingot_after_six_ticks() {
        let mut f = fixture(|_| Vec::new(), 100);
        let ore = f.catalog.resource_id("ore").unwrap();
        let ingot = f.catalog.resource_id("ingot").unwrap();
        let mut events = EventLog::new();

        for tick in 0..6 {
            run(&mut f, tick, &mut events);
            let ledger = &f.world.businesses[f.business].ledger;
            assert_eq!(ledger.amount(ingot), Fixed64::ZERO, "tick {tick}");
            assert_eq!(ledger.amount(ore), fixed_int(100), "tick {tick}");
        }
        let report = run(&mut f, 6, &mut events);
        assert_eq!(report.completed, 1);
        let ledger = &f.world.businesses[f.business].ledger;
        assert_eq!(ledger.amount(ingot), fixed_int(1));
        // The next cycle starts on the same tick and reserves, not removes.
        assert_eq!(ledger.amount(ore), fixed_int(98));
    }

    #[test]
    fn inputs_are_reserved_while_running() {
        let mut f = fixture(|_| Vec::new(), 3);
        let ore = f.catalog.resource_id("ore").unwrap();
        let mut events = EventLog::new();
        run(&mut f, 0, &mut events);
        let business = &f.world.businesses[f.business];
        assert_eq!(business.active_job.map(|a| a.completes_tick), Some(6));
        assert_eq!(business.next_job_tick, 6);
        assert_eq!(business.ledger.available(ore), fixed_int(1));
        assert!(business.ledger.is_consistent());
    }

    #[test]
    fn no_candidate_defers_by_interval() {
        let mut f = fixture(|_| Vec::new(), 1);
        let mut events = EventLog::new();
        let config = SimulationConfig::default();
        let report = run_jobs(&mut f.world, &f.catalog, &config, &OpenStanding, 0, &mut events);
        assert_eq!(report.no_candidate, 1);
        assert_eq!(f.world.businesses[f.business].next_job_tick, 10);
        assert!(matches!(
            events.events()[0],
            EconomyEvent::NoCandidate { retry_at: 10, .. }
        ));
        // Not due again until the retry tick.
        let report = run_jobs(&mut f.world, &f.catalog, &config, &OpenStanding, 5, &mut events);
        assert_eq!(report, SchedulerReport::default());
    }

    #[test]
    fn higher_score_wins_and_ties_keep_first() {
        let f = fixture(
            |b| {
                let ore = b.resource_id("ore").unwrap();
                let ingot = b.resource_id("ingot").unwrap();
                let twin = b.register_job(
                    JobDefinition::new("smelt_twin", 6)
                        .input(ore, fixed_int(2))
                        .output(ingot, fixed_int(1)),
                );
                let bulk = b.register_job(
                    JobDefinition::new("bulk", 8)
                        .input(ore, fixed_int(2))
                        .output(ingot, fixed_int(3)),
                );
                vec![twin, bulk]
            },
            10,
        );
        let bulk = f.catalog.job_id("bulk").unwrap();
        assert_eq!(select_job(&f.world, &f.catalog, &OpenStanding, f.business), Some(bulk));

        let mut g = fixture(
            |b| {
                let ore = b.resource_id("ore").unwrap();
                let ingot = b.resource_id("ingot").unwrap();
                vec![b.register_job(
                    JobDefinition::new("smelt_twin", 6)
                        .input(ore, fixed_int(2))
                        .output(ingot, fixed_int(1)),
                )]
            },
            10,
        );
        let smelt = g.catalog.job_id("smelt").unwrap();
        assert_eq!(select_job(&g.world, &g.catalog, &OpenStanding, g.business), Some(smelt));
        g.world.businesses[g.business].kind = BusinessKindId(7);
        assert_eq!(select_job(&g.world, &g.catalog, &OpenStanding, g.business), None);
    }

    #[test]
    fn tech_gate_blocks_until_researched() {
        let mut f = fixture(
            |b| {
                let ore = b.resource_id("ore").unwrap();
                let ingot = b.resource_id("ingot").unwrap();
                vec![b.register_job(
                    JobDefinition::new("advanced", 6)
                        .tech_tier(2)
                        .input(ore, fixed_int(2))
                        .output(ingot, fixed_int(5)),
                )]
            },
            10,
        );
        let smelt = f.catalog.job_id("smelt").unwrap();
        let advanced = f.catalog.job_id("advanced").unwrap();
        assert_eq!(select_job(&f.world, &f.catalog, &OpenStanding, f.business), Some(smelt));

        let colony = f.world.businesses[f.business].colony;
        f.world.colonies[colony].tech = TechLevel {
            processing: 2,
            ..TechLevel::default()
        };
        assert_eq!(select_job(&f.world, &f.catalog, &OpenStanding, f.business), Some(advanced));
    }

    struct Closed;

    impl StandingGate for Closed {
        fn passes_standing_gate(&self, _: BusinessId, _: FactionId, _: Fixed64) -> bool {
            false
        }
    }

    #[test]
    fn standing_gate_consults_faction() {
        let mut f = fixture(|_| Vec::new(), 10);
        f.catalog = {
            let mut b = CatalogBuilder::new();
            let ore = b.register_resource(ResourceDef::new("ore"));
            let ingot = b.register_resource(ResourceDef::new("ingot"));
            let job = b.register_job(
                JobDefinition::new("licensed", 6)
                    .standing(fixed_int(5))
                    .input(ore, fixed_int(2))
                    .output(ingot, fixed_int(1)),
            );
            b.register_business(BusinessDefinition::new("refinery", OwnerKind::Faction).job(job));
            b.build().unwrap()
        };
        // No colony faction: nothing to consult.
        assert!(select_job(&f.world, &f.catalog, &Closed, f.business).is_some());

        let faction = f.world.add_faction("Union", None);
        let colony = f.world.businesses[f.business].colony;
        f.world.colonies[colony].faction = Some(faction);
        assert!(select_job(&f.world, &f.catalog, &Closed, f.business).is_none());
        assert!(select_job(&f.world, &f.catalog, &OpenStanding, f.business).is_some());
    }

    #[test]
    fn facility_elsewhere_in_colony_counts() {
        let mut f = fixture(|_| Vec::new(), 10);
        let colony = f.world.businesses[f.business].colony;
        let business = &mut f.world.businesses[f.business];
        business.facility = None;
        business.facility_class = None;
        assert!(select_job(&f.world, &f.catalog, &OpenStanding, f.business).is_some());

        let refinery = f.world.facility_of_class(colony, FacilityClass::Refinery).unwrap();
        f.world.facilities.remove(refinery);
        assert!(select_job(&f.world, &f.catalog, &OpenStanding, f.business).is_none());
    }

    #[test]
    fn full_output_stalls_then_recovers() {
        let mut f = fixture(|_| Vec::new(), 10);
        let ingot = f.catalog.resource_id("ingot").unwrap();
        let ore = f.catalog.resource_id("ore").unwrap();
        let mut events = EventLog::new();
        run(&mut f, 0, &mut events);

        let ledger = &mut f.world.businesses[f.business].ledger;
        ledger.set_capacity(ingot, fixed_int(2));
        let _ = ledger.add(ingot, fixed_int(2));

        let report = run(&mut f, 6, &mut events);
        assert_eq!(report.stalled, 1);
        assert!(f.world.businesses[f.business].active_job.unwrap().stalled);
        let report = run(&mut f, 7, &mut events);
        assert_eq!(report.stalled, 0);
        assert_eq!(f.world.businesses[f.business].ledger.amount(ore), fixed_int(10));

        let _ = f.world.businesses[f.business].ledger.remove(ingot, fixed_int(2));
        let report = run(&mut f, 8, &mut events);
        assert_eq!(report.completed, 1);
        let business = &f.world.businesses[f.business];
        assert_eq!(business.ledger.amount(ingot), fixed_int(1));
        assert!(business.next_job_tick >= business.last_job_tick);
    }

    #[test]
    fn private_owner_gets_job_role() {
        let mut f = fixture(|_| Vec::new(), 10);
        let colony = f.world.businesses[f.business].colony;
        let owner = f.world.owners.insert(BusinessOwner {
            kind: OwnerKind::Individual,
            home_colony: colony,
            faction: None,
            created_tick: 0,
            job_role: None,
        });
        f.world.businesses[f.business].owner = Some(OwnerRef::Private(owner));
        let mut events = EventLog::new();
        run(&mut f, 0, &mut events);
        let role = f.world.owners[owner].job_role.unwrap();
        assert_eq!(role.business, f.business);
        assert_eq!(role.job, f.catalog.job_id("smelt").unwrap());
        assert_eq!(role.next_evaluate_tick, 6);
    }

    #[test]
    fn block_reasons_follow_filter_order() {
        let f = fixture(|_| Vec::new(), 1);
        let ore = f.catalog.resource_id("ore").unwrap();
        let business = &f.world.businesses[f.business];
        let smelt = f.catalog.job(f.catalog.job_id("smelt").unwrap()).unwrap();
        assert_eq!(
            check_candidate(&f.world, &OpenStanding, f.business, business, smelt),
            Err(JobBlock::MissingInput(ore))
        );
        let gated = smelt.clone().tech_tier(3);
        assert_eq!(
            check_candidate(&f.world, &OpenStanding, f.business, business, &gated),
            Err(JobBlock::TechTier { have: 0, need: 3 })
        );
    }

    #[test]
    fn throughput_shortens_duration() {
        let fast = ResearchUnlocks::from_tech(&TechLevel {
            processing: 10,
            ..TechLevel::default()
        });
        assert_eq!(effective_duration(6, &ResearchUnlocks::default()), 6);
        assert_eq!(effective_duration(6, &fast), 3);
        assert_eq!(effective_duration(1, &fast), 1);
    }
}
