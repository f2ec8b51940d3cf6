use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a colony in the world.
    pub struct ColonyId;

    /// Identifies a colony-attached facility (refinery, shipyard, ...).
    pub struct FacilityId;

    /// Identifies a ship or carrier holding a cargo ledger.
    pub struct CarrierId;

    /// Identifies an installed ship/facility module.
    pub struct ModuleId;

    /// Identifies a hauler shuttle.
    pub struct HaulerId;

    /// Identifies a spawned business.
    pub struct BusinessId;

    /// Identifies a lazily created group or individual business owner.
    pub struct OwnerId;

    /// Identifies a faction.
    pub struct FactionId;

    /// Identifies an empire (a union of factions).
    pub struct EmpireId;
}

/// Identifies a resource type in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceTypeId(pub u32);

/// Identifies a job recipe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u32);

/// Identifies a business archetype in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessKindId(pub u32);

/// Role a facility plays for businesses in its colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityClass {
    Refinery,
    Production,
    ModuleFacility,
    ShipFabrication,
    Shipyard,
    Construction,
    Research,
}

/// Who ends up owning a business of a given archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Faction,
    Empire,
    Group,
    Individual,
}

impl OwnerKind {
    /// Group and individual owners are created on demand at spawn time.
    pub fn is_private(self) -> bool {
        matches!(self, OwnerKind::Group | OwnerKind::Individual)
    }
}

/// A resolved business owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerRef {
    Faction(FactionId),
    Empire(EmpireId),
    Private(OwnerId),
}

/// Anything a business can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetRef {
    Facility(FacilityId),
    Ship(CarrierId),
    Module(ModuleId),
}

/// Coarse asset type recorded on ownership links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Facility,
    Ship,
    Module,
}

impl AssetRef {
    pub fn asset_type(self) -> AssetType {
        match self {
            AssetRef::Facility(_) => AssetType::Facility,
            AssetRef::Ship(_) => AssetType::Ship,
            AssetRef::Module(_) => AssetType::Module,
        }
    }
}
