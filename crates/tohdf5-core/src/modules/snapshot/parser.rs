use super::model::{ParticleRecord, Snapshot, SnapshotHeader};
use crate::common::{RecordError, RecordPayload, SequentialRecordReader, SequentialRecordWriter};
use crate::domain::{IngestError, IngestResult};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotDecodeError {
    #[error(transparent)]
    Framing(#[from] RecordError),
    #[error("header declares {declared} species but at most {expected} are expected")]
    SpeciesCount { declared: i32, expected: usize },
    #[error("particle arrays differ in length: s={s}, chi={chi}, phi={phi}")]
    ArrayLengths { s: usize, chi: usize, phi: usize },
}

impl SnapshotDecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Framing(_) => "FORMAT.RECORD_FRAMING",
            Self::SpeciesCount { .. } => "FORMAT.SPECIES_COUNT",
            Self::ArrayLengths { .. } => "FORMAT.ARRAY_LENGTH",
        }
    }

    fn into_ingest_error(self, path: &Path) -> IngestError {
        IngestError::malformed_record(
            self.code(),
            format!("snapshot '{}': {}", path.display(), self),
        )
    }
}

/// Decodes one snapshot buffer.
///
/// The header is read in two steps: fixed fields up to and including the
/// species count, then exactly that many `iskin` entries. The three particle
/// arrays follow as separate records.
pub fn decode_snapshot(
    bytes: &[u8],
    expected_species: usize,
) -> Result<Snapshot, SnapshotDecodeError> {
    let mut reader = SequentialRecordReader::new(bytes);

    let mut record = reader.next_record()?;
    let process_count = record.take_i32("nproc")?;
    let particle_count = record.take_i32("npart")?;
    let end_time = record.take_f64("endtime")?;
    let declared = record.take_i32("nspecies")?;
    let species_count = usize::try_from(declared)
        .ok()
        .filter(|count| *count <= expected_species)
        .ok_or(SnapshotDecodeError::SpeciesCount {
            declared,
            expected: expected_species,
        })?;
    let iskin = record.take_i32_array(species_count, "iskin")?;
    let reserved = [
        record.take_f64("reserved[0]")?,
        record.take_f64("reserved[1]")?,
        record.take_f64("reserved[2]")?,
    ];
    record.finish()?;

    let s = reader.next_record()?.into_f64_array()?;
    let chi = reader.next_record()?.into_f64_array()?;
    let phi = reader.next_record()?.into_f64_array()?;
    if s.len() != chi.len() || s.len() != phi.len() {
        return Err(SnapshotDecodeError::ArrayLengths {
            s: s.len(),
            chi: chi.len(),
            phi: phi.len(),
        });
    }

    if !reader.is_exhausted() {
        debug!(
            trailing_bytes = reader.remaining_bytes(),
            "ignoring data after the particle records"
        );
    }

    Ok(Snapshot {
        header: SnapshotHeader {
            process_count,
            particle_count,
            end_time,
            iskin,
            reserved,
        },
        particles: ParticleRecord { s, chi, phi },
    })
}

/// Reads and decodes one snapshot file. The file is closed before returning.
pub fn read_snapshot_file(path: &Path, expected_species: usize) -> IngestResult<Snapshot> {
    let bytes = fs::read(path).map_err(|source| {
        IngestError::io_system(
            "IO.SNAPSHOT_READ",
            format!("failed to read snapshot '{}': {}", path.display(), source),
        )
    })?;
    decode_snapshot(&bytes, expected_species).map_err(|error| error.into_ingest_error(path))
}

/// Writes a snapshot in the layout [`decode_snapshot`] reads.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, RecordError> {
    let header = &snapshot.header;
    let species_count = i32::try_from(header.species_count()).map_err(|_| RecordError::Oversized {
        length: header.species_count(),
    })?;

    let mut writer = SequentialRecordWriter::new();
    let mut payload = RecordPayload::new();
    payload
        .put_i32(header.process_count)
        .put_i32(header.particle_count)
        .put_f64(header.end_time)
        .put_i32(species_count)
        .put_i32_slice(&header.iskin)
        .put_f64_slice(&header.reserved);
    writer.push_record(&payload)?;

    for values in [
        &snapshot.particles.s,
        &snapshot.particles.chi,
        &snapshot.particles.phi,
    ] {
        let mut payload = RecordPayload::new();
        payload.put_f64_slice(values);
        writer.push_record(&payload)?;
    }

    Ok(writer.into_bytes())
}
