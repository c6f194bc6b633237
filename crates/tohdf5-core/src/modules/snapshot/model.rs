use crate::domain::CartesianPositions;
use crate::numerics::{CoordinateLengthError, FluxGeometry, flux_to_cartesian_batch};

/// Leading record of a snapshot file.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHeader {
    pub process_count: i32,
    pub particle_count: i32,
    pub end_time: f64,
    /// Per-species bookkeeping; its length is the declared species count.
    pub iskin: Vec<i32>,
    pub reserved: [f64; 3],
}

impl SnapshotHeader {
    pub fn species_count(&self) -> usize {
        self.iskin.len()
    }
}

/// Flux coordinates of every particle in one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticleRecord {
    pub s: Vec<f64>,
    pub chi: Vec<f64>,
    pub phi: Vec<f64>,
}

impl ParticleRecord {
    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn to_cartesian(
        &self,
        geometry: FluxGeometry,
    ) -> Result<CartesianPositions, CoordinateLengthError> {
        flux_to_cartesian_batch(&self.s, &self.chi, &self.phi, geometry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub header: SnapshotHeader,
    pub particles: ParticleRecord,
}
