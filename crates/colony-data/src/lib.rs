pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, EconomyData, load_economy_data};

use std::path::PathBuf;

/// Directory holding the bundled default data set.
pub fn default_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}
