//! Snapshot ingestion: every snapshot file of a run merged per species.

use crate::common::SimulationConfig;
use crate::domain::{IngestError, IngestResult, IngestWarning, IngestionPath, ParticleBatch};
use crate::modules::aggregate::Aggregator;
use crate::modules::discovery::{Discovery, discover_species, list_directory};
use crate::modules::pipeline::{IngestOutcome, handle_file_error, log_warnings, require_inputs};
use crate::modules::snapshot::read_snapshot_file;
use crate::numerics::FluxGeometry;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationInput {
    /// Every regular file of the directory, in file-name order.
    Directory(PathBuf),
    /// Files in the order given.
    Files(Vec<PathBuf>),
}

impl SimulationInput {
    pub fn resolve(&self) -> IngestResult<Vec<PathBuf>> {
        match self {
            Self::Directory(directory) => list_directory(directory),
            Self::Files(files) => Ok(files.clone()),
        }
    }
}

impl SimulationConfig {
    pub fn geometry(&self) -> FluxGeometry {
        FluxGeometry {
            tokamak_radius: self.tokamak_radius,
            minor_radius: self.minor_radius,
        }
    }
}

pub fn ingest_simulation(
    input: &SimulationInput,
    config: &SimulationConfig,
) -> IngestResult<IngestOutcome> {
    let files = input.resolve()?;
    ingest_snapshot_files(&files, config)
}

/// Decodes, maps and merges `files` into one group per species.
///
/// The species order is fixed by discovery before any file is opened, so a
/// species whose files are all skipped still keeps its index.
pub fn ingest_snapshot_files(
    files: &[PathBuf],
    config: &SimulationConfig,
) -> IngestResult<IngestOutcome> {
    require_inputs(files, "snapshot")?;
    let discovery = discover_species(files, &config.species_naming);
    let mut warnings = unrecognized_warnings(&discovery);
    if discovery.entries.is_empty() {
        return Err(IngestError::input_validation(
            "INPUT.NO_SPECIES",
            format!(
                "none of the {} input file name(s) is long enough to name a species",
                files.len()
            ),
        ));
    }

    let keys = discovery.keys();
    let expected_species = config.expected_species.unwrap_or(keys.len());
    info!(
        files = discovery.entries.len(),
        species = keys.len(),
        expected_species,
        "discovered snapshot files"
    );

    let mut aggregator = Aggregator::species(config.max_files_per_species);
    for key in &keys {
        aggregator.declare(key);
    }

    let geometry = config.geometry();
    let aggregator = discovery
        .entries
        .iter()
        .try_fold(aggregator, |mut aggregator, entry| {
            if !aggregator.accepts(&entry.key) {
                aggregator.skip_file(&entry.key);
                debug!(path = %entry.path.display(), species = %entry.key, "species cap reached");
                return Ok(aggregator);
            }

            match load_batch(&entry.path, expected_species, geometry) {
                Ok(batch) => {
                    info!(
                        path = %entry.path.display(),
                        species = %entry.key,
                        particles = batch.len(),
                        "read snapshot"
                    );
                    aggregator.append(&entry.key, batch)?;
                }
                Err(error) => handle_file_error(error, config.on_malformed, &mut warnings)?,
            }
            Ok::<_, IngestError>(aggregator)
        })?;

    let (groups, finish_warnings) = aggregator.finish();
    log_warnings(&finish_warnings);
    warnings.extend(finish_warnings);
    Ok(IngestOutcome {
        path: IngestionPath::Simulation,
        groups,
        warnings,
    })
}

fn load_batch(
    path: &Path,
    expected_species: usize,
    geometry: FluxGeometry,
) -> IngestResult<ParticleBatch> {
    let snapshot = read_snapshot_file(path, expected_species)?;
    let coordinates = snapshot.particles.to_cartesian(geometry).map_err(|error| {
        IngestError::internal(
            "SYS.FLUX_MAPPING",
            format!("snapshot '{}' passed decoding with {}", path.display(), error),
        )
    })?;
    Ok(ParticleBatch::from_coordinates(coordinates))
}

fn unrecognized_warnings(discovery: &Discovery) -> Vec<IngestWarning> {
    let warnings: Vec<IngestWarning> = discovery
        .unrecognized
        .iter()
        .map(|path| {
            IngestWarning::skipped_file(format!(
                "'{}' has no species name and was ignored",
                path.display()
            ))
        })
        .collect();
    log_warnings(&warnings);
    warnings
}

#[cfg(test)]
mod tests {
    use super::{SimulationInput, ingest_simulation, ingest_snapshot_files};
    use crate::common::{MalformedPolicy, SimulationConfig};
    use crate::domain::{IngestErrorCategory, Provenance};
    use crate::modules::snapshot::{ParticleRecord, Snapshot, SnapshotHeader, encode_snapshot};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_snapshot(directory: &Path, name: &str, particles: usize, species: usize) -> PathBuf {
        let snapshot = Snapshot {
            header: SnapshotHeader {
                process_count: 1,
                particle_count: particles as i32,
                end_time: 0.0,
                iskin: vec![0; species],
                reserved: [0.0; 3],
            },
            particles: ParticleRecord {
                s: vec![0.5; particles],
                chi: vec![0.0; particles],
                phi: vec![0.0; particles],
            },
        };
        let path = directory.join(name);
        fs::write(&path, encode_snapshot(&snapshot).expect("encode")).expect("write snapshot");
        path
    }

    #[test]
    fn directory_input_is_read_in_name_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_snapshot(temp.path(), "i_0.dat", 4, 2);
        write_snapshot(temp.path(), "e_0.dat", 3, 2);

        let outcome = ingest_simulation(
            &SimulationInput::Directory(temp.path().to_path_buf()),
            &SimulationConfig::default(),
        )
        .expect("ingest should succeed");

        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(outcome.groups[0].particle_type.key, "e");
        assert_eq!(outcome.groups[0].provenance, Some(Provenance::species("e")));
        assert_eq!(outcome.groups[1].len(), 4);
        let [x, y, z] = outcome.groups[0].coordinates[0];
        assert!((x - 1.38).abs() < 1e-12);
        assert_eq!(x, y);
        assert_eq!(z, 0.0);
    }

    #[test]
    fn species_count_defaults_to_discovered_species() {
        let temp = TempDir::new().expect("tempdir should be created");
        let files = vec![
            write_snapshot(temp.path(), "e_0.dat", 2, 3),
            write_snapshot(temp.path(), "i_0.dat", 2, 1),
        ];

        let error = ingest_snapshot_files(&files, &SimulationConfig::default())
            .expect_err("e_0 declares more species than were discovered");
        assert_eq!(error.category(), IngestErrorCategory::MalformedRecordError);
        assert_eq!(error.code(), "FORMAT.SPECIES_COUNT");
        assert!(error.message().contains("e_0.dat"));

        let config = SimulationConfig {
            expected_species: Some(3),
            ..SimulationConfig::default()
        };
        let outcome = ingest_snapshot_files(&files, &config).expect("explicit count admits both");
        assert_eq!(outcome.groups.len(), 2);
    }

    #[test]
    fn skip_policy_keeps_the_species_index_of_skipped_files() {
        let temp = TempDir::new().expect("tempdir should be created");
        let broken = temp.path().join("e_0.dat");
        fs::write(&broken, [1, 2, 3]).expect("write broken file");
        let files = vec![broken, write_snapshot(temp.path(), "i_0.dat", 5, 2)];

        let config = SimulationConfig {
            on_malformed: MalformedPolicy::Skip,
            ..SimulationConfig::default()
        };
        let outcome = ingest_snapshot_files(&files, &config).expect("skip policy continues");

        assert_eq!(outcome.groups[0].particle_type.key, "e");
        assert!(outcome.groups[0].is_empty());
        assert_eq!(outcome.groups[1].len(), 5);
        let codes: Vec<&str> = outcome.warnings.iter().map(|warning| warning.code).collect();
        assert_eq!(codes, vec!["WARN.SKIPPED_FILE", "WARN.EMPTY_DATA"]);
    }

    #[test]
    fn files_beyond_the_cap_are_not_opened() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut files: Vec<PathBuf> = (0..2)
            .map(|index| write_snapshot(temp.path(), &format!("e_{index}.dat"), 10, 1))
            .collect();
        let unreadable = temp.path().join("e_2.dat");
        fs::write(&unreadable, b"not a snapshot").expect("write");
        files.push(unreadable);

        let config = SimulationConfig {
            max_files_per_species: 2,
            ..SimulationConfig::default()
        };
        let outcome = ingest_snapshot_files(&files, &config).expect("third file is never read");
        assert_eq!(outcome.groups[0].len(), 20);
        assert_eq!(outcome.groups[0].file_count, 2);
    }

    #[test]
    fn missing_inputs_are_rejected() {
        let error = ingest_snapshot_files(&[], &SimulationConfig::default()).expect_err("no files");
        assert_eq!(error.code(), "INPUT.NO_FILES");

        let error = ingest_snapshot_files(&[PathBuf::from(".dat")], &SimulationConfig::default())
            .expect_err("no species");
        assert_eq!(error.code(), "INPUT.NO_SPECIES");
    }
}
