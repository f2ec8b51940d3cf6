use crate::fixed::{Fixed64, Ticks, fixed_ratio};
use crate::id::*;
use crate::market::MarketCategory;
use crate::stock::StockPool;
use std::collections::HashMap;

/// Score penalty applied to jobs that produce nothing.
pub const NO_OUTPUT_PENALTY: Fixed64 = fixed_ratio(1, 10);

/// Metadata for one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
    pub name: String,
    /// Market category used for purchases and surplus export.
    pub market: Option<MarketCategory>,
    /// Colony reserve that procurement pulls from and the bridge deposits into.
    pub stock_pool: Option<StockPool>,
    /// Colony reserve haulers deposit into. Falls back to `stock_pool`.
    pub delivery_pool: Option<StockPool>,
    /// Units a business keeps before the bridge exports surplus.
    pub reserve: Fixed64,
    /// Starting amount a new business receives when a job consumes this type.
    pub seed_amount: Fixed64,
}

impl ResourceDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            market: None,
            stock_pool: None,
            delivery_pool: None,
            reserve: Fixed64::ZERO,
            seed_amount: Fixed64::ZERO,
        }
    }

    pub fn with_market(mut self, market: MarketCategory) -> Self {
        self.market = Some(market);
        self
    }

    pub fn with_stock_pool(mut self, pool: StockPool) -> Self {
        self.stock_pool = Some(pool);
        self
    }

    pub fn with_delivery_pool(mut self, pool: StockPool) -> Self {
        self.delivery_pool = Some(pool);
        self
    }

    pub fn with_reserve(mut self, reserve: Fixed64) -> Self {
        self.reserve = reserve;
        self
    }

    pub fn with_seed_amount(mut self, amount: Fixed64) -> Self {
        self.seed_amount = amount;
        self
    }

    /// Reserve pool a hauler delivery of this type lands in.
    pub fn hauler_pool(&self) -> Option<StockPool> {
        self.delivery_pool.or(self.stock_pool)
    }
}

/// A job input or output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEntry {
    pub resource: ResourceTypeId,
    pub units: Fixed64,
}

/// A catalog job recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    pub name: String,
    pub required_facility: Option<FacilityClass>,
    pub min_tech_tier: u8,
    /// Minimum standing with the colony's faction. Zero disables the gate.
    pub standing_gate: Fixed64,
    pub duration: Ticks,
    pub inputs: Vec<JobEntry>,
    pub outputs: Vec<JobEntry>,
}

impl JobDefinition {
    pub fn new(name: &str, duration: Ticks) -> Self {
        Self {
            name: name.to_string(),
            required_facility: None,
            min_tech_tier: 0,
            standing_gate: Fixed64::ZERO,
            duration,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn requires(mut self, facility: FacilityClass) -> Self {
        self.required_facility = Some(facility);
        self
    }

    pub fn tech_tier(mut self, tier: u8) -> Self {
        self.min_tech_tier = tier;
        self
    }

    pub fn standing(mut self, threshold: Fixed64) -> Self {
        self.standing_gate = threshold;
        self
    }

    pub fn input(mut self, resource: ResourceTypeId, units: Fixed64) -> Self {
        self.inputs.push(JobEntry { resource, units });
        self
    }

    pub fn output(mut self, resource: ResourceTypeId, units: Fixed64) -> Self {
        self.outputs.push(JobEntry { resource, units });
        self
    }

    /// Jobs with no duration stay in the catalog but are never started.
    pub fn is_schedulable(&self) -> bool {
        self.duration > 0
    }

    pub fn total_input(&self) -> Fixed64 {
        self.inputs
            .iter()
            .fold(Fixed64::ZERO, |acc, e| acc.saturating_add(e.units))
    }

    pub fn total_output(&self) -> Fixed64 {
        self.outputs
            .iter()
            .fold(Fixed64::ZERO, |acc, e| acc.saturating_add(e.units))
    }

    /// Candidate score: total output minus total input, with a small penalty
    /// for jobs that produce nothing.
    pub fn score(&self) -> Fixed64 {
        let output = self.total_output();
        let mut score = output.saturating_sub(self.total_input());
        if output <= Fixed64::ZERO {
            score = score.saturating_sub(NO_OUTPUT_PENALTY);
        }
        score
    }
}

/// A business archetype.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessDefinition {
    pub name: String,
    pub owner_kind: OwnerKind,
    /// Facility class the business attaches to. `None` means the business
    /// spawns without a facility.
    pub primary_facility: Option<FacilityClass>,
    /// Jobs the business may run, in tie-break order.
    pub allowed_jobs: Vec<JobId>,
    pub starting_credits: Fixed64,
    /// Hull handed out by fleet seeding.
    pub starter_hull: Option<String>,
}

impl BusinessDefinition {
    pub fn new(name: &str, owner_kind: OwnerKind) -> Self {
        Self {
            name: name.to_string(),
            owner_kind,
            primary_facility: None,
            allowed_jobs: Vec::new(),
            starting_credits: Fixed64::ZERO,
            starter_hull: None,
        }
    }

    pub fn facility(mut self, class: FacilityClass) -> Self {
        self.primary_facility = Some(class);
        self
    }

    pub fn job(mut self, job: JobId) -> Self {
        self.allowed_jobs.push(job);
        self
    }

    pub fn credits(mut self, credits: Fixed64) -> Self {
        self.starting_credits = credits;
        self
    }

    pub fn hull(mut self, hull: &str) -> Self {
        self.starter_hull = Some(hull.to_string());
        self
    }
}

/// Builder for constructing an immutable Catalog.
/// Two-phase lifecycle: registration -> validated build.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceTypeId>,
    jobs: Vec<JobDefinition>,
    job_name_to_id: HashMap<String, JobId>,
    businesses: Vec<BusinessDefinition>,
    business_name_to_id: HashMap<String, BusinessKindId>,
    duplicates: Vec<(&'static str, String)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type. Returns its ID.
    pub fn register_resource(&mut self, def: ResourceDef) -> ResourceTypeId {
        let id = ResourceTypeId(self.resources.len() as u32);
        if self.resource_name_to_id.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("resource", def.name.clone()));
        }
        self.resources.push(def);
        id
    }

    /// Register a job recipe. Returns its ID.
    pub fn register_job(&mut self, def: JobDefinition) -> JobId {
        let id = JobId(self.jobs.len() as u32);
        if self.job_name_to_id.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("job", def.name.clone()));
        }
        self.jobs.push(def);
        id
    }

    /// Register a business archetype. Returns its ID.
    pub fn register_business(&mut self, def: BusinessDefinition) -> BusinessKindId {
        let id = BusinessKindId(self.businesses.len() as u32);
        if self.business_name_to_id.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("business", def.name.clone()));
        }
        self.businesses.push(def);
        id
    }

    /// Mutate an existing job by name.
    pub fn mutate_job<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut JobDefinition),
    {
        let id = self
            .job_name_to_id
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(&mut self.jobs[id.0 as usize]);
        Ok(())
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceTypeId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn job_id(&self, name: &str) -> Option<JobId> {
        self.job_name_to_id.get(name).copied()
    }

    pub fn business_id(&self, name: &str) -> Option<BusinessKindId> {
        self.business_name_to_id.get(name).copied()
    }

    /// Validate and freeze the catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some((kind, name)) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateName { kind, name });
        }

        for job in &self.jobs {
            for entry in job.inputs.iter().chain(job.outputs.iter()) {
                if entry.resource.0 as usize >= self.resources.len() {
                    return Err(CatalogError::InvalidResourceRef {
                        job: job.name.clone(),
                        resource: entry.resource,
                    });
                }
                if entry.units < Fixed64::ZERO {
                    return Err(CatalogError::NegativeUnits {
                        job: job.name.clone(),
                        resource: entry.resource,
                    });
                }
            }
        }

        for business in &self.businesses {
            for job in &business.allowed_jobs {
                if job.0 as usize >= self.jobs.len() {
                    return Err(CatalogError::InvalidJobRef {
                        business: business.name.clone(),
                        job: *job,
                    });
                }
            }
            if business.starting_credits < Fixed64::ZERO {
                return Err(CatalogError::NegativeCredits(business.name.clone()));
            }
        }

        Ok(Catalog {
            resources: self.resources,
            resource_name_to_id: self.resource_name_to_id,
            jobs: self.jobs,
            job_name_to_id: self.job_name_to_id,
            businesses: self.businesses,
            business_name_to_id: self.business_name_to_id,
        })
    }
}

/// Immutable catalog. Frozen after build(); shared between stages as
/// `Arc<Catalog>`.
#[derive(Debug)]
pub struct Catalog {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceTypeId>,
    jobs: Vec<JobDefinition>,
    job_name_to_id: HashMap<String, JobId>,
    businesses: Vec<BusinessDefinition>,
    business_name_to_id: HashMap<String, BusinessKindId>,
}

impl Catalog {
    pub fn resource(&self, id: ResourceTypeId) -> Option<&ResourceDef> {
        self.resources.get(id.0 as usize)
    }

    pub fn job(&self, id: JobId) -> Option<&JobDefinition> {
        self.jobs.get(id.0 as usize)
    }

    pub fn business(&self, id: BusinessKindId) -> Option<&BusinessDefinition> {
        self.businesses.get(id.0 as usize)
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceTypeId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn job_id(&self, name: &str) -> Option<JobId> {
        self.job_name_to_id.get(name).copied()
    }

    pub fn business_id(&self, name: &str) -> Option<BusinessKindId> {
        self.business_name_to_id.get(name).copied()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn business_count(&self) -> usize {
        self.businesses.len()
    }

    /// Business archetypes in registration order.
    pub fn businesses(&self) -> impl Iterator<Item = (BusinessKindId, &BusinessDefinition)> {
        self.businesses
            .iter()
            .enumerate()
            .map(|(i, b)| (BusinessKindId(i as u32), b))
    }

    /// Jobs a business kind may run, in its allowed-job order. Unknown kinds
    /// and unknown job ids yield nothing.
    pub fn jobs_for(&self, kind: BusinessKindId) -> impl Iterator<Item = (JobId, &JobDefinition)> {
        self.business(kind)
            .into_iter()
            .flat_map(|b| b.allowed_jobs.iter())
            .filter_map(move |&id| self.job(id).map(|job| (id, job)))
    }

    /// Largest per-job input requirement of each resource type across every
    /// job a business kind may run, in first-seen order.
    pub fn per_cycle_inputs(&self, kind: BusinessKindId) -> Vec<(ResourceTypeId, Fixed64)> {
        let mut needs: Vec<(ResourceTypeId, Fixed64)> = Vec::new();
        for (_, job) in self.jobs_for(kind) {
            for input in &job.inputs {
                let units = input.units.max(Fixed64::ZERO);
                match needs.iter_mut().find(|(r, _)| *r == input.resource) {
                    Some((_, need)) => *need = (*need).max(units),
                    None => needs.push((input.resource, units)),
                }
            }
        }
        needs
    }

    /// Market category of a resource type, if it trades.
    pub fn market_for(&self, resource: ResourceTypeId) -> Option<MarketCategory> {
        self.resource(resource).and_then(|r| r.market)
    }

    pub fn stock_pool_for(&self, resource: ResourceTypeId) -> Option<StockPool> {
        self.resource(resource).and_then(|r| r.stock_pool)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("job {job} references unknown resource {resource:?}")]
    InvalidResourceRef { job: String, resource: ResourceTypeId },
    #[error("job {job} has negative units of {resource:?}")]
    NegativeUnits { job: String, resource: ResourceTypeId },
    #[error("business {business} references unknown job {job:?}")]
    InvalidJobRef { business: String, job: JobId },
    #[error("business {0} has negative starting credits")]
    NegativeCredits(String),
}
