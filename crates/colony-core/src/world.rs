//! Entity records and the world that owns them.
//!
//! Every entity kind lives in its own `SlotMap`, so a destroyed entity's key
//! stops resolving and dependent state machines can detect it. Iteration over
//! a `SlotMap` is in slot order, which is reproducible for a given sequence of
//! inserts and removals.

use crate::fixed::{Fixed64, Ticks, fixed_int, non_negative};
use crate::geometry::Vec3;
use crate::hauler::Hauler;
use crate::id::*;
use crate::ledger::Ledger;
use crate::market::Market;
use crate::ownership::OwnershipGraph;
use crate::stock::ColonyIndustryStock;
use crate::tech::{Baselined, CrewTraining, ResearchUnlocks, SalvageCapability, TechLevel};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Colony {
    pub name: String,
    pub position: Vec3,
    pub population: Fixed64,
    pub faction: Option<FactionId>,
    pub tech: TechLevel,
    pub unlocks: ResearchUnlocks,
    /// Absent until the colony's industry is bootstrapped.
    pub stock: Option<ColonyIndustryStock>,
    pub market: Option<Market>,
    /// Set once business spawn has run for this colony.
    pub businesses_spawned: bool,
}

impl Colony {
    pub fn new(name: &str, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            position,
            population: Fixed64::ZERO,
            faction: None,
            tech: TechLevel::default(),
            unlocks: ResearchUnlocks::default(),
            stock: None,
            market: None,
            businesses_spawned: false,
        }
    }

    pub fn with_population(mut self, population: Fixed64) -> Self {
        self.population = non_negative(population);
        self
    }

    pub fn with_faction(mut self, faction: FactionId) -> Self {
        self.faction = Some(faction);
        self
    }

    pub fn with_tech(mut self, tech: TechLevel) -> Self {
        self.tech = tech;
        self
    }

    pub fn with_stock(mut self, stock: ColonyIndustryStock) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_market(mut self, market: Market) -> Self {
        self.market = Some(market);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Facility {
    pub colony: ColonyId,
    pub class: FacilityClass,
    /// Jobs the facility may queue. Unset until research first reaches it.
    pub queue_capacity: Option<u8>,
    pub training: Baselined<CrewTraining>,
}

impl Facility {
    pub fn new(colony: ColonyId, class: FacilityClass) -> Self {
        Self {
            colony,
            class,
            queue_capacity: None,
            training: Baselined::new(CrewTraining::default()),
        }
    }
}

/// A ship holding a cargo ledger.
#[derive(Debug, Clone)]
pub struct Carrier {
    pub position: Vec3,
    pub home_colony: Option<ColonyId>,
    pub faction: Option<FactionId>,
    pub cargo: Ledger,
    pub hull: Option<String>,
    pub mining_efficiency: Baselined<Fixed64>,
    pub salvage: Baselined<SalvageCapability>,
}

impl Carrier {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            home_colony: None,
            faction: None,
            cargo: Ledger::new(),
            hull: None,
            mining_efficiency: Baselined::new(fixed_int(1)),
            salvage: Baselined::new(SalvageCapability::default()),
        }
    }

    pub fn with_home(mut self, colony: ColonyId) -> Self {
        self.home_colony = Some(colony);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub installed_on: Option<CarrierId>,
}

#[derive(Debug, Clone)]
pub struct Faction {
    pub name: String,
    pub empire: Option<EmpireId>,
}

#[derive(Debug, Clone)]
pub struct Empire {
    pub name: String,
}

/// Job a private owner is currently assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRoleAssignment {
    pub job: JobId,
    pub business: BusinessId,
    pub assigned_tick: Ticks,
    pub next_evaluate_tick: Ticks,
}

/// A lazily created group or individual owner.
#[derive(Debug, Clone)]
pub struct BusinessOwner {
    pub kind: OwnerKind,
    pub home_colony: ColonyId,
    pub faction: Option<FactionId>,
    pub created_tick: Ticks,
    pub job_role: Option<JobRoleAssignment>,
}

/// The job a business is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveJob {
    pub job: JobId,
    pub started_tick: Ticks,
    pub completes_tick: Ticks,
    /// Set once the job has finished but its outputs did not fit.
    pub stalled: bool,
}

#[derive(Debug, Clone)]
pub struct BusinessState {
    pub kind: BusinessKindId,
    pub owner_kind: OwnerKind,
    /// `None` when the owner could not be resolved at spawn.
    pub owner: Option<OwnerRef>,
    pub colony: ColonyId,
    pub facility: Option<FacilityId>,
    pub facility_class: Option<FacilityClass>,
    pub active_job: Option<ActiveJob>,
    pub last_job_tick: Ticks,
    pub next_job_tick: Ticks,
    pub credits: Fixed64,
    pub ledger: Ledger,
    pub fleet_seeded: bool,
}

impl BusinessState {
    pub fn new(kind: BusinessKindId, owner_kind: OwnerKind, colony: ColonyId, now: Ticks) -> Self {
        Self {
            kind,
            owner_kind,
            owner: None,
            colony,
            facility: None,
            facility_class: None,
            active_job: None,
            last_job_tick: 0,
            next_job_tick: now,
            credits: Fixed64::ZERO,
            ledger: Ledger::new(),
            fleet_seeded: false,
        }
    }

    pub fn active_job_id(&self) -> Option<JobId> {
        self.active_job.map(|a| a.job)
    }

    pub fn is_idle(&self) -> bool {
        self.active_job.is_none()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct World {
    pub colonies: SlotMap<ColonyId, Colony>,
    pub facilities: SlotMap<FacilityId, Facility>,
    pub carriers: SlotMap<CarrierId, Carrier>,
    pub modules: SlotMap<ModuleId, Module>,
    pub haulers: SlotMap<HaulerId, Hauler>,
    pub businesses: SlotMap<BusinessId, BusinessState>,
    pub owners: SlotMap<OwnerId, BusinessOwner>,
    pub factions: SlotMap<FactionId, Faction>,
    pub empires: SlotMap<EmpireId, Empire>,
    pub ownership: OwnershipGraph,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_empire(&mut self, name: &str) -> EmpireId {
        self.empires.insert(Empire {
            name: name.to_string(),
        })
    }

    pub fn add_faction(&mut self, name: &str, empire: Option<EmpireId>) -> FactionId {
        self.factions.insert(Faction {
            name: name.to_string(),
            empire,
        })
    }

    pub fn add_colony(&mut self, colony: Colony) -> ColonyId {
        self.colonies.insert(colony)
    }

    pub fn add_facility(&mut self, colony: ColonyId, class: FacilityClass) -> FacilityId {
        self.facilities.insert(Facility::new(colony, class))
    }

    pub fn add_carrier(&mut self, carrier: Carrier) -> CarrierId {
        self.carriers.insert(carrier)
    }

    pub fn add_hauler(&mut self, hauler: Hauler) -> HaulerId {
        self.haulers.insert(hauler)
    }

    pub fn add_module(&mut self, name: &str, installed_on: Option<CarrierId>) -> ModuleId {
        self.modules.insert(Module {
            name: name.to_string(),
            installed_on,
        })
    }

    /// Destroy a colony. Dependent records keep their stale key and notice
    /// on their next visit.
    pub fn remove_colony(&mut self, colony: ColonyId) -> Option<Colony> {
        self.colonies.remove(colony)
    }

    pub fn remove_carrier(&mut self, carrier: CarrierId) -> Option<Carrier> {
        self.carriers.remove(carrier)
    }

    /// First facility of `class` attached to `colony`, in slot order.
    pub fn facility_of_class(&self, colony: ColonyId, class: FacilityClass) -> Option<FacilityId> {
        self.facilities
            .iter()
            .find(|(_, f)| f.colony == colony && f.class == class)
            .map(|(id, _)| id)
    }

    pub fn colony_has_facility(&self, colony: ColonyId, class: FacilityClass) -> bool {
        self.facility_of_class(colony, class).is_some()
    }

    /// Whether the asset behind a reference still exists.
    pub fn asset_exists(&self, asset: AssetRef) -> bool {
        match asset {
            AssetRef::Facility(id) => self.facilities.contains_key(id),
            AssetRef::Ship(id) => self.carriers.contains_key(id),
            AssetRef::Module(id) => self.modules.contains_key(id),
        }
    }

    /// Drop ownership links whose business or asset was destroyed. Returns
    /// the number of links removed.
    pub fn prune_ownership(&mut self) -> usize {
        let mut graph = std::mem::take(&mut self.ownership);
        let removed = graph.retain_valid(
            |business| self.businesses.contains_key(business),
            |asset| self.asset_exists(asset),
        );
        self.ownership = graph;
        removed
    }

    /// Faction an owner reference answers to, if any.
    pub fn owner_faction(&self, owner: OwnerRef) -> Option<FactionId> {
        match owner {
            OwnerRef::Faction(faction) => Some(faction),
            OwnerRef::Empire(_) => None,
            OwnerRef::Private(id) => self.owners.get(id).and_then(|o| o.faction),
        }
    }
}
