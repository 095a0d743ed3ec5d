//! Pipeline configuration.
//!
//! Every field has a default, so a configuration file only needs the
//! values it changes.

use crate::location::matching::MatchMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Settings shared by the summary and location commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Location cache table.
    pub cache_path: PathBuf,
    /// Directory summary tables are written to.
    pub output_dir: PathBuf,
    /// Standardized category whose share of annual spend is reported.
    pub funeral_category: String,
    /// Standardized category whose annual totals are reported.
    pub perambulation_category: String,
    /// Grid reference value the lookup service uses for places outside its region.
    pub out_of_region_marker: String,
    /// How requested names are tested against cached titles.
    pub match_mode: MatchMode,
    /// Look names up again when only an unresolved placeholder covers them.
    pub retry_unresolved: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("output/parish_locations.csv"),
            output_dir: PathBuf::from("output"),
            funeral_category: "Funeral".to_string(),
            perambulation_category: "Perambulation".to_string(),
            out_of_region_marker: "Not in UK".to_string(),
            match_mode: MatchMode::Substring,
            retry_unresolved: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
