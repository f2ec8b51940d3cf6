use crate::fixed::{Fixed64, fixed_int, non_negative};
use crate::id::ResourceTypeId;
use serde::{Deserialize, Serialize};

/// Capacity given to ledger entries created on demand.
pub const DEFAULT_CAPACITY: Fixed64 = fixed_int(5000);

/// One resource type held by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub resource: ResourceTypeId,
    pub amount: Fixed64,
    pub capacity: Fixed64,
    /// Portion of `amount` committed to a running job.
    #[serde(default)]
    pub reserved: Fixed64,
}

impl ResourceEntry {
    pub fn new(resource: ResourceTypeId, capacity: Fixed64) -> Self {
        Self {
            resource,
            amount: Fixed64::ZERO,
            capacity: non_negative(capacity),
            reserved: Fixed64::ZERO,
        }
    }

    /// Amount not committed to a running job.
    pub fn available(&self) -> Fixed64 {
        non_negative(self.amount - self.reserved)
    }

    /// Remaining room before the entry reaches capacity.
    pub fn headroom(&self) -> Fixed64 {
        non_negative(self.capacity - self.amount)
    }
}

/// Resource storage owned by a business, carrier, or hauler. One entry per
/// resource type, kept in insertion order so iteration is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<ResourceEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, resource: ResourceTypeId) -> Option<usize> {
        self.entries.iter().position(|e| e.resource == resource)
    }

    pub fn entry(&self, resource: ResourceTypeId) -> Option<&ResourceEntry> {
        self.entries.iter().find(|e| e.resource == resource)
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Make sure an entry for `resource` exists, creating it with
    /// [`DEFAULT_CAPACITY`] if needed.
    pub fn ensure_entry(&mut self, resource: ResourceTypeId) -> &mut ResourceEntry {
        let index = match self.index_of(resource) {
            Some(i) => i,
            None => {
                self.entries.push(ResourceEntry::new(resource, DEFAULT_CAPACITY));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Raise an entry to at least `amount` (clamped to capacity). Used when
    /// seeding a freshly spawned business.
    pub fn seed(&mut self, resource: ResourceTypeId, amount: Fixed64) {
        let entry = self.ensure_entry(resource);
        if amount > Fixed64::ZERO {
            entry.amount = entry.amount.max(amount).min(entry.capacity);
        }
    }

    /// Set the capacity of an entry, creating it if needed.
    pub fn set_capacity(&mut self, resource: ResourceTypeId, capacity: Fixed64) {
        let entry = self.ensure_entry(resource);
        entry.capacity = non_negative(capacity);
    }

    /// Total amount held of a resource (including reserved units).
    pub fn amount(&self, resource: ResourceTypeId) -> Fixed64 {
        self.entry(resource).map(|e| e.amount).unwrap_or(Fixed64::ZERO)
    }

    /// Amount of a resource not reserved by a running job.
    pub fn available(&self, resource: ResourceTypeId) -> Fixed64 {
        self.entry(resource).map(|e| e.available()).unwrap_or(Fixed64::ZERO)
    }

    /// Room left for a resource. Types not yet in the ledger report the
    /// capacity a new entry would get.
    pub fn headroom(&self, resource: ResourceTypeId) -> Fixed64 {
        self.entry(resource).map(|e| e.headroom()).unwrap_or(DEFAULT_CAPACITY)
    }

    /// Whether at least `units` of `resource` are present and unreserved.
    pub fn has_available(&self, resource: ResourceTypeId, units: Fixed64) -> bool {
        match self.entry(resource) {
            Some(e) => e.available() >= units,
            None => units <= Fixed64::ZERO,
        }
    }

    /// Sum of all amounts across entries.
    pub fn total(&self) -> Fixed64 {
        self.entries
            .iter()
            .fold(Fixed64::ZERO, |acc, e| acc.saturating_add(e.amount))
    }

    /// Add units of a resource. Returns the amount that didn't fit; the
    /// caller keeps that remainder in its source.
    #[must_use = "overflow is the remainder that did not fit and must stay in the source"]
    pub fn add(&mut self, resource: ResourceTypeId, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let entry = self.ensure_entry(resource);
        let to_add = amount.min(entry.headroom());
        entry.amount += to_add;
        amount - to_add
    }

    /// Remove unreserved units of a resource. Returns the amount actually removed.
    #[must_use = "returns the amount actually removed, which may be less than requested"]
    pub fn remove(&mut self, resource: ResourceTypeId, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let Some(index) = self.index_of(resource) else {
            return Fixed64::ZERO;
        };
        let entry = &mut self.entries[index];
        let removed = amount.min(entry.available());
        entry.amount -= removed;
        removed
    }

    /// Commit units to a running job. Returns false (and reserves nothing)
    /// if not enough unreserved units are present.
    pub fn reserve(&mut self, resource: ResourceTypeId, units: Fixed64) -> bool {
        let Some(index) = self.index_of(resource) else {
            return units <= Fixed64::ZERO;
        };
        let entry = &mut self.entries[index];
        if entry.available() < units {
            return false;
        }
        entry.reserved += non_negative(units);
        true
    }

    /// Release previously reserved units.
    pub fn release(&mut self, resource: ResourceTypeId, units: Fixed64) {
        if let Some(index) = self.index_of(resource) {
            let entry = &mut self.entries[index];
            entry.reserved = non_negative(entry.reserved - units);
        }
    }

    /// Drop every reservation.
    pub fn release_all(&mut self) {
        for entry in &mut self.entries {
            entry.reserved = Fixed64::ZERO;
        }
    }

    /// Consume reserved units: release the reservation and remove the
    /// amount in one step. Returns the amount consumed.
    pub fn consume_reserved(&mut self, resource: ResourceTypeId, units: Fixed64) -> Fixed64 {
        let Some(index) = self.index_of(resource) else {
            return Fixed64::ZERO;
        };
        let entry = &mut self.entries[index];
        let consumed = units.min(entry.reserved).min(entry.amount);
        entry.reserved -= consumed;
        entry.amount -= consumed;
        consumed
    }

    /// Check the ledger invariants: 0 <= reserved <= amount <= capacity and
    /// one entry per resource type.
    pub fn is_consistent(&self) -> bool {
        let entries_ok = self.entries.iter().all(|e| {
            e.amount >= Fixed64::ZERO
                && e.amount <= e.capacity
                && e.reserved >= Fixed64::ZERO
                && e.reserved <= e.amount
        });
        let unique = self
            .entries
            .iter()
            .enumerate()
            .all(|(i, e)| self.entries[..i].iter().all(|o| o.resource != e.resource));
        entries_ok && unique
    }
}
