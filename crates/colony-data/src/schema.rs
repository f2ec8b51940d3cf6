//! Serde data file structs for economy content definitions.
//!
//! These structs define the on-disk format for resources, jobs, and business
//! archetypes. They are deserialized from RON, JSON, or TOML data files and
//! then resolved into catalog entries by the loader.

use colony_core::id::{FacilityClass, OwnerKind};
use colony_core::market::MarketCategory;
use colony_core::stock::StockPool;
use serde::Deserialize;

// ===========================================================================
// Resources
// ===========================================================================

/// A resource type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    #[serde(default)]
    pub market: Option<MarketCategory>,
    #[serde(default)]
    pub stock_pool: Option<StockPool>,
    /// Reserve haulers unload into when it differs from `stock_pool`.
    #[serde(default)]
    pub delivery_pool: Option<StockPool>,
    #[serde(default)]
    pub reserve: f64,
    /// Starting ledger amount for businesses whose jobs consume this type.
    #[serde(default)]
    pub seed: f64,
}

// ===========================================================================
// Jobs
// ===========================================================================

/// A job line: `("resource_name", units)`.
pub type EntryData = (String, f64);

/// A job definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct JobData {
    pub name: String,
    pub duration: u64,
    #[serde(default)]
    pub facility: Option<FacilityClass>,
    #[serde(default)]
    pub tech_tier: u8,
    #[serde(default)]
    pub standing: f64,
    #[serde(default)]
    pub inputs: Vec<EntryData>,
    #[serde(default)]
    pub outputs: Vec<EntryData>,
}

// ===========================================================================
// Businesses
// ===========================================================================

/// A business archetype in a data file. `jobs` lists job names in
/// tie-break order.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessData {
    pub name: String,
    pub owner: OwnerKind,
    #[serde(default)]
    pub facility: Option<FacilityClass>,
    #[serde(default)]
    pub jobs: Vec<String>,
    #[serde(default)]
    pub credits: f64,
    #[serde(default)]
    pub starter_hull: Option<String>,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_defaults() {
        let data: ResourceData = ron::from_str(r#"(name: "ore")"#).unwrap();
        assert_eq!(data.name, "ore");
        assert!(data.market.is_none());
        assert!(data.stock_pool.is_none());
        assert_eq!(data.reserve, 0.0);
    }

    #[test]
    fn resource_with_pools() {
        let data: ResourceData = ron::from_str(
            r#"(name: "minerals", market: Some(refined_metal), delivery_pool: Some(ore))"#,
        )
        .unwrap();
        assert_eq!(data.market, Some(MarketCategory::RefinedMetal));
        assert_eq!(data.delivery_pool, Some(StockPool::Ore));
        assert!(data.stock_pool.is_none());
    }

    #[test]
    fn job_from_json() {
        let data: JobData = serde_json::from_str(
            r#"{"name": "smelt", "duration": 6, "facility": "refinery",
                "inputs": [["ore", 2.0]], "outputs": [["ingot", 1.0]]}"#,
        )
        .unwrap();
        assert_eq!(data.facility, Some(FacilityClass::Refinery));
        assert_eq!(data.inputs, vec![("ore".to_string(), 2.0)]);
        assert_eq!(data.tech_tier, 0);
    }

    #[test]
    fn business_from_toml() {
        let data: BusinessData = toml::from_str(
            r#"
            name = "hauling_company"
            owner = "individual"
            starter_hull = "ore_hauler"
            credits = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(data.owner, OwnerKind::Individual);
        assert_eq!(data.starter_hull.as_deref(), Some("ore_hauler"));
        assert!(data.jobs.is_empty());
        assert!(data.facility.is_none());
    }
}
