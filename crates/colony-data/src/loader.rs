//! Resolution pipeline: reads data files, resolves name references, builds
//! the catalog.
//!
//! A data directory holds `resources`, `jobs`, and `businesses` files plus an
//! optional `simulation` file, each in RON, TOML, or JSON (detected from the
//! extension). Jobs refer to resources by name and businesses refer to jobs
//! by name; both are resolved here so the core only ever sees dense ids.

use colony_core::catalog::{
    BusinessDefinition, Catalog, CatalogBuilder, CatalogError, JobDefinition, ResourceDef,
};
use colony_core::config::SimulationConfig;
use colony_core::fixed::Fixed64;
use colony_core::id::{JobId, ResourceTypeId};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::schema::{BusinessData, EntryData, JobData, ResourceData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A number does not fit the fixed-point range (or is NaN).
    #[error("invalid {field} {value} for '{name}' in {file}")]
    InvalidNumber {
        file: PathBuf,
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [(&str, Format); 3] = [
    ("ron", Format::Ron),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(name, _)| Some(*name) == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml`, or `.json` in `dir`.
///
/// Returns `Ok(None)` when no file exists and `ConflictingFormats` when more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for (ext, _) in EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found.take() {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. RON and JSON files hold the list directly; TOML files
/// hold it as an array of tables under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let mut table: toml::Table = deserialize_file(path)?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

fn to_fixed(value: f64, file: &Path, name: &str, field: &'static str) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::InvalidNumber {
        file: file.to_path_buf(),
        name: name.to_string(),
        field,
        value,
    })
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Catalog and configuration loaded from a data directory.
#[derive(Debug)]
pub struct EconomyData {
    pub catalog: Catalog,
    pub config: SimulationConfig,
}

fn register_resources(
    builder: &mut CatalogBuilder,
    resources: Vec<ResourceData>,
    file: &Path,
) -> Result<HashMap<String, ResourceTypeId>, DataLoadError> {
    let mut ids = HashMap::with_capacity(resources.len());
    for data in resources {
        check_duplicate(&ids, &data.name, file)?;
        let mut def = ResourceDef::new(&data.name)
            .with_reserve(to_fixed(data.reserve, file, &data.name, "reserve")?)
            .with_seed_amount(to_fixed(data.seed, file, &data.name, "seed")?);
        def.market = data.market;
        def.stock_pool = data.stock_pool;
        def.delivery_pool = data.delivery_pool;
        let id = builder.register_resource(def);
        ids.insert(data.name, id);
    }
    Ok(ids)
}

fn resolve_entries(
    entries: &[EntryData],
    resources: &HashMap<String, ResourceTypeId>,
    file: &Path,
    job: &str,
) -> Result<Vec<(ResourceTypeId, Fixed64)>, DataLoadError> {
    entries
        .iter()
        .map(|(name, units)| {
            let id = *resolve_name(resources, name, file, "resource")?;
            Ok((id, to_fixed(*units, file, job, "units")?))
        })
        .collect()
}

fn register_jobs(
    builder: &mut CatalogBuilder,
    jobs: Vec<JobData>,
    resources: &HashMap<String, ResourceTypeId>,
    file: &Path,
) -> Result<HashMap<String, JobId>, DataLoadError> {
    let mut ids = HashMap::with_capacity(jobs.len());
    for data in jobs {
        check_duplicate(&ids, &data.name, file)?;
        let mut def = JobDefinition::new(&data.name, data.duration)
            .tech_tier(data.tech_tier)
            .standing(to_fixed(data.standing, file, &data.name, "standing")?);
        if let Some(class) = data.facility {
            def = def.requires(class);
        }
        for (resource, units) in resolve_entries(&data.inputs, resources, file, &data.name)? {
            def = def.input(resource, units);
        }
        for (resource, units) in resolve_entries(&data.outputs, resources, file, &data.name)? {
            def = def.output(resource, units);
        }
        if !def.is_schedulable() {
            debug!("job {} has no duration and will never be scheduled", data.name);
        }
        let id = builder.register_job(def);
        ids.insert(data.name, id);
    }
    Ok(ids)
}

fn register_businesses(
    builder: &mut CatalogBuilder,
    businesses: Vec<BusinessData>,
    jobs: &HashMap<String, JobId>,
    file: &Path,
) -> Result<usize, DataLoadError> {
    let mut seen: HashMap<String, ()> = HashMap::with_capacity(businesses.len());
    for data in businesses {
        check_duplicate(&seen, &data.name, file)?;
        let mut def = BusinessDefinition::new(&data.name, data.owner)
            .credits(to_fixed(data.credits, file, &data.name, "credits")?);
        if let Some(class) = data.facility {
            def = def.facility(class);
        }
        if let Some(hull) = data.starter_hull.as_deref() {
            def = def.hull(hull);
        }
        for job in &data.jobs {
            def = def.job(*resolve_name(jobs, job, file, "job")?);
        }
        builder.register_business(def);
        seen.insert(data.name, ());
    }
    Ok(seen.len())
}

/// Load every data file in `dir` and build the catalog.
///
/// A missing `simulation` file leaves the configuration at its defaults.
pub fn load_economy_data(dir: &Path) -> Result<EconomyData, DataLoadError> {
    let resources_path = require_data_file(dir, "resources")?;
    let jobs_path = require_data_file(dir, "jobs")?;
    let businesses_path = require_data_file(dir, "businesses")?;

    let mut builder = CatalogBuilder::new();
    let resources = register_resources(
        &mut builder,
        deserialize_list(&resources_path, "resources")?,
        &resources_path,
    )?;
    let jobs = register_jobs(
        &mut builder,
        deserialize_list(&jobs_path, "jobs")?,
        &resources,
        &jobs_path,
    )?;
    let businesses = register_businesses(
        &mut builder,
        deserialize_list(&businesses_path, "businesses")?,
        &jobs,
        &businesses_path,
    )?;
    let catalog = builder.build()?;

    let config = match find_data_file(dir, "simulation")? {
        Some(path) => deserialize_file(&path)?,
        None => SimulationConfig::default(),
    };

    info!(
        "loaded {} resources, {} jobs, {} businesses from {}",
        resources.len(),
        jobs.len(),
        businesses,
        dir.display()
    );
    Ok(EconomyData { catalog, config })
}

// ===========================================================================
// Tests
// ===========================================================================
