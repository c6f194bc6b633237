//! Run configuration for the three ingestion paths.
//!
//! Every struct deserializes from JSON with missing fields falling back to
//! their defaults, so a config file only needs to name what it overrides.

use crate::domain::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_FILES_PER_SPECIES: usize = 100;
pub const DEFAULT_TOKAMAK_RADIUS: f64 = 0.88;
pub const DEFAULT_MINOR_RADIUS: f64 = 0.25;
pub const DEFAULT_SPECIES_SUFFIX_LEN: usize = 4;

/// What to do when one input file fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Abort the whole run.
    #[default]
    Abort,
    /// Log the file and continue without it.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpeciesNaming {
    /// Trailing characters removed from the file name (the extension token).
    pub suffix_len: usize,
    /// Also drop a trailing `_<digits>` chunk index, so `e_0.dat` and `e_1.dat` share a key.
    pub strip_index_token: bool,
}

impl Default for SpeciesNaming {
    fn default() -> Self {
        Self {
            suffix_len: DEFAULT_SPECIES_SUFFIX_LEN,
            strip_index_token: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_files_per_species: usize,
    pub tokamak_radius: f64,
    pub minor_radius: f64,
    /// Upper bound for the species count declared in a snapshot header.
    /// `None` uses the number of species discovered in the input listing.
    pub expected_species: Option<usize>,
    pub species_naming: SpeciesNaming,
    pub on_malformed: MalformedPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_files_per_species: DEFAULT_MAX_FILES_PER_SPECIES,
            tokamak_radius: DEFAULT_TOKAMAK_RADIUS,
            minor_radius: DEFAULT_MINOR_RADIUS,
            expected_species: None,
            species_naming: SpeciesNaming::default(),
            on_malformed: MalformedPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogColumns {
    pub redshift: String,
    pub right_ascension: String,
    pub declination: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            redshift: "z".to_string(),
            right_ascension: "ra".to_string(),
            declination: "dec".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub columns: CatalogColumns,
    pub cosmology: CosmologyConfig,
    pub on_malformed: MalformedPolicy,
}

/// Flat LCDM parameters; defaults are the Planck 2015 values.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CosmologyConfig {
    pub hubble_constant: f64,
    pub omega_matter: f64,
}

impl Default for CosmologyConfig {
    fn default() -> Self {
        Self {
            hubble_constant: 67.74,
            omega_matter: 0.3075,
        }
    }
}

/// Tabular input: which columns hold what, and how the file is read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TabularConfig {
    /// `x,y,z[,radius[,luminosity]]` as zero-based column indices.
    pub columns: String,
    /// First non-comment line names the columns and is not data.
    pub has_header: bool,
    pub delimiter: char,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            columns: "0,1,2".to_string(),
            has_header: true,
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    #[default]
    Json,
    Hdf5,
}

impl ContainerFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Some(Self::Json),
            Some("hdf5" | "h5" | "he5") => Some(Self::Hdf5),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub box_size: f64,
    pub format: Option<ContainerFormat>,
}

/// Config file layout: one optional section per ingestion path.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub container: ContainerConfig,
    pub simulation: SimulationConfig,
    pub catalog: CatalogConfig,
    pub tabular: TabularConfig,
}

impl IngestConfig {
    pub fn load(path: &Path) -> IngestResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            IngestError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read config '{}': {}", path.display(), source),
            )
        })?;
        serde_json::from_str(&source).map_err(|source| {
            IngestError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse config '{}': {}", path.display(), source),
            )
        })
    }
}
