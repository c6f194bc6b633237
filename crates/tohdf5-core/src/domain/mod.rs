pub mod errors;

pub use errors::{ExitMapping, IngestError, IngestErrorCategory, IngestResult, IngestWarning};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// One particle position per row: (x, y, z).
pub type CartesianPositions = Vec<[f64; 3]>;

pub const HEADER_GROUP: &str = "Header";
pub const BOX_SIZE_ATTRIBUTE: &str = "BoxSize";
pub const COORDINATES_DATASET: &str = "Coordinates";
pub const RADIUS_DATASET: &str = "Radius";
pub const LUMINOSITY_DATASET: &str = "Luminosity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionPath {
    Catalog,
    Tabular,
    Simulation,
}

impl IngestionPath {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "CATALOG",
            Self::Tabular => "TABULAR",
            Self::Simulation => "SIMULATION",
        }
    }
}

impl Display for IngestionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Category under which particles are grouped, indexed by first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticleType {
    pub index: usize,
    pub key: String,
}

impl ParticleType {
    pub fn new(index: usize, key: impl Into<String>) -> Self {
        Self {
            index,
            key: key.into(),
        }
    }

    pub fn group_name(&self) -> String {
        format!("PartType{}", self.index)
    }
}

/// Attribute attached to a group describing where its particles came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub attribute: &'static str,
    pub value: String,
}

impl Provenance {
    pub fn directory(value: impl Into<String>) -> Self {
        Self {
            attribute: "Directory",
            value: value.into(),
        }
    }

    pub fn species(value: impl Into<String>) -> Self {
        Self {
            attribute: "Species",
            value: value.into(),
        }
    }

    pub fn source(value: impl Into<String>) -> Self {
        Self {
            attribute: "Source",
            value: value.into(),
        }
    }
}

/// Positions and optional per-particle scalars extracted from one input file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticleBatch {
    pub coordinates: CartesianPositions,
    pub radius: Option<Vec<f64>>,
    pub luminosity: Option<Vec<f64>>,
}

impl ParticleBatch {
    pub fn from_coordinates(coordinates: CartesianPositions) -> Self {
        Self {
            coordinates,
            radius: None,
            luminosity: None,
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Finalized per-type output. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub particle_type: ParticleType,
    pub provenance: Option<Provenance>,
    pub coordinates: CartesianPositions,
    pub radius: Option<Vec<f64>>,
    pub luminosity: Option<Vec<f64>>,
    pub file_count: usize,
}

impl Group {
    pub fn name(&self) -> String {
        self.particle_type.group_name()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerHeader {
    pub box_size: f64,
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self { box_size: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub key: String,
    pub particle_count: usize,
    pub file_count: usize,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            name: group.name(),
            key: group.particle_type.key.clone(),
            particle_count: group.len(),
            file_count: group.file_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub path: IngestionPath,
    pub output_path: PathBuf,
    pub groups: Vec<GroupSummary>,
    pub warnings: Vec<IngestWarning>,
}

impl IngestReport {
    pub fn total_particles(&self) -> usize {
        self.groups.iter().map(|group| group.particle_count).sum()
    }

    pub fn render_human_summary(&self) -> String {
        let mut lines = vec![format!(
            "{} ingestion: {} group(s), {} particle(s) -> {}",
            self.path,
            self.groups.len(),
            self.total_particles(),
            self.output_path.display()
        )];
        for group in &self.groups {
            lines.push(format!(
                "  {:<10} {:<24} particles={:<10} files={}",
                group.name, group.key, group.particle_count, group.file_count
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("  {}", warning));
        }
        lines.join("\n")
    }
}
