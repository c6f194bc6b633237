//! Sky catalog ingestion: one group per catalog directory.

use crate::common::{CatalogColumns, MalformedPolicy};
use crate::domain::{IngestError, IngestResult, IngestionPath, ParticleBatch};
use crate::modules::aggregate::Aggregator;
use crate::modules::discovery::discover_directories;
use crate::modules::pipeline::{IngestOutcome, handle_file_error, log_warnings, require_inputs};
use crate::numerics::{DistanceModel, sky_to_cartesian_batch};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use tracing::info;

/// Redshift and sky position of every object in one catalog file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkyCatalog {
    pub redshift: Vec<f64>,
    pub right_ascension: Vec<f64>,
    /// Degrees, like `right_ascension`.
    pub declination: Vec<f64>,
}

impl SkyCatalog {
    pub fn len(&self) -> usize {
        self.redshift.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redshift.is_empty()
    }

    fn push(&mut self, redshift: f64, right_ascension: f64, declination: f64) {
        self.redshift.push(redshift);
        self.right_ascension.push(right_ascension);
        self.declination.push(declination);
    }
}

/// Source of catalog rows. Implementations own the file format.
pub trait CatalogReader {
    fn read_catalog(&self, path: &Path) -> IngestResult<SkyCatalog>;
}

/// Comma separated catalogs with a header row naming the columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvCatalogReader {
    columns: CatalogColumns,
}

impl CsvCatalogReader {
    pub fn new(columns: CatalogColumns) -> Self {
        Self { columns }
    }

    fn column_index(&self, path: &Path, headers: &StringRecord, name: &str) -> IngestResult<usize> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| {
                IngestError::input_validation(
                    "INPUT.CATALOG_COLUMN",
                    format!("catalog '{}' has no column named '{}'", path.display(), name),
                )
            })
    }
}

impl CatalogReader for CsvCatalogReader {
    fn read_catalog(&self, path: &Path) -> IngestResult<SkyCatalog> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_path(path)
            .map_err(|error| csv_error(path, error))?;
        let headers = reader.headers().map_err(|error| csv_error(path, error))?.clone();
        let redshift = self.column_index(path, &headers, &self.columns.redshift)?;
        let right_ascension = self.column_index(path, &headers, &self.columns.right_ascension)?;
        let declination = self.column_index(path, &headers, &self.columns.declination)?;

        let mut catalog = SkyCatalog::default();
        for record in reader.records() {
            let record = record.map_err(|error| csv_error(path, error))?;
            let line = record.position().map_or(0, |position| position.line());
            let value = |index: usize| parse_field(path, line, &record, index);
            catalog.push(value(redshift)?, value(right_ascension)?, value(declination)?);
        }
        Ok(catalog)
    }
}

fn parse_field(path: &Path, line: u64, record: &StringRecord, index: usize) -> IngestResult<f64> {
    let field = record.get(index).unwrap_or_default();
    field.parse::<f64>().map_err(|_| {
        IngestError::malformed_record(
            "FORMAT.CATALOG_VALUE",
            format!(
                "catalog '{}' line {}: column {} holds '{}', not a number",
                path.display(),
                line,
                index,
                field
            ),
        )
    })
}

fn csv_error(path: &Path, error: csv::Error) -> IngestError {
    let message = format!("failed to read catalog '{}': {}", path.display(), error);
    if error.is_io_error() {
        IngestError::io_system("IO.CATALOG_READ", message)
    } else {
        IngestError::malformed_record("FORMAT.CATALOG_CSV", message)
    }
}

/// Reads every catalog, places its objects with `distance`, and merges the
/// results per parent directory in first-seen order.
pub fn ingest_catalogs<R, D>(
    files: &[PathBuf],
    reader: &R,
    distance: &D,
    on_malformed: MalformedPolicy,
) -> IngestResult<IngestOutcome>
where
    R: CatalogReader + ?Sized,
    D: DistanceModel + ?Sized,
{
    require_inputs(files, "catalog")?;
    let discovery = discover_directories(files);
    let mut warnings = Vec::new();

    let aggregator = discovery
        .entries
        .iter()
        .try_fold(Aggregator::directories(), |mut aggregator, entry| {
            aggregator.declare(&entry.key);
            match load_batch(&entry.path, reader, distance) {
                Ok(batch) => {
                    info!(
                        path = %entry.path.display(),
                        directory = %entry.key,
                        objects = batch.len(),
                        "read catalog"
                    );
                    aggregator.append(&entry.key, batch)?;
                }
                Err(error) => handle_file_error(error, on_malformed, &mut warnings)?,
            }
            Ok::<_, IngestError>(aggregator)
        })?;

    let (groups, finish_warnings) = aggregator.finish();
    log_warnings(&finish_warnings);
    warnings.extend(finish_warnings);
    Ok(IngestOutcome {
        path: IngestionPath::Catalog,
        groups,
        warnings,
    })
}

fn load_batch<R, D>(path: &Path, reader: &R, distance: &D) -> IngestResult<ParticleBatch>
where
    R: CatalogReader + ?Sized,
    D: DistanceModel + ?Sized,
{
    let catalog = reader.read_catalog(path)?;
    let coordinates = sky_to_cartesian_batch(
        &catalog.redshift,
        &catalog.right_ascension,
        &catalog.declination,
        distance,
    )
    .map_err(|error| {
        IngestError::malformed_record(
            "FORMAT.CATALOG_LENGTH",
            format!("catalog '{}': {}", path.display(), error),
        )
    })?;
    Ok(ParticleBatch::from_coordinates(coordinates))
}

#[cfg(test)]
mod tests {
    use super::{CatalogReader, CsvCatalogReader, SkyCatalog, ingest_catalogs};
    use crate::common::{CatalogColumns, MalformedPolicy};
    use crate::domain::{IngestErrorCategory, IngestResult, Provenance};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn linear(redshift: f64) -> f64 {
        1000.0 * redshift
    }

    fn write(path: &Path, contents: &str) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(path, contents).expect("write catalog");
        path.to_path_buf()
    }

    #[test]
    fn csv_reader_finds_named_columns_in_any_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = write(
            &temp.path().join("cat.csv"),
            "# survey extract\nid, dec, z, ra\n1, 0.0, 0.5, 90.0\n2, 45.0, 1.0, 0.0\n",
        );

        let catalog = CsvCatalogReader::default().read_catalog(&path).expect("read");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.redshift, vec![0.5, 1.0]);
        assert_eq!(catalog.right_ascension, vec![90.0, 0.0]);
        assert_eq!(catalog.declination, vec![0.0, 45.0]);
    }

    #[test]
    fn custom_column_names_are_honoured() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = write(&temp.path().join("cat.csv"), "Z,RA,DEC\n0.1,10,20\n");
        let reader = CsvCatalogReader::new(CatalogColumns {
            redshift: "Z".to_string(),
            right_ascension: "RA".to_string(),
            declination: "DEC".to_string(),
        });
        assert_eq!(reader.read_catalog(&path).expect("read").len(), 1);

        let error = CsvCatalogReader::default()
            .read_catalog(&path)
            .expect_err("lower-case names are missing");
        assert_eq!(error.code(), "INPUT.CATALOG_COLUMN");
    }

    #[test]
    fn non_numeric_value_names_file_and_line() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = write(&temp.path().join("bad.csv"), "z,ra,dec\n0.1,1,2\nzero,1,2\n");
        let error = CsvCatalogReader::default().read_catalog(&path).expect_err("bad value");
        assert_eq!(error.category(), IngestErrorCategory::MalformedRecordError);
        assert!(error.message().contains("bad.csv"));
        assert!(error.message().contains("line 3"));
    }

    #[test]
    fn catalogs_are_grouped_by_directory_in_first_seen_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        let north = temp.path().join("north");
        let south = temp.path().join("south");
        let files = vec![
            write(&south.join("a.csv"), "z,ra,dec\n0.0,0,0\n"),
            write(&north.join("a.csv"), "z,ra,dec\n1.0,0,0\n0.5,90,0\n"),
            write(&south.join("b.csv"), "z,ra,dec\n0.2,0,90\n"),
        ];

        let outcome = ingest_catalogs(
            &files,
            &CsvCatalogReader::default(),
            &linear,
            MalformedPolicy::Abort,
        )
        .expect("ingest should succeed");

        assert_eq!(outcome.groups.len(), 2);
        let first = &outcome.groups[0];
        assert_eq!(first.name(), "PartType0");
        assert_eq!(
            first.provenance,
            Some(Provenance::directory(south.to_string_lossy().replace('\\', "/")))
        );
        assert_eq!(first.len(), 2);
        assert_eq!(first.coordinates[0], [0.0, 0.0, 0.0]);
        assert!((first.coordinates[1][2] - 200.0).abs() < 1e-9);
        assert_eq!(outcome.groups[1].coordinates[0], [1000.0, 0.0, 0.0]);
    }

    struct Ragged;

    impl CatalogReader for Ragged {
        fn read_catalog(&self, _path: &Path) -> IngestResult<SkyCatalog> {
            Ok(SkyCatalog {
                redshift: vec![0.1, 0.2],
                right_ascension: vec![0.0],
                declination: vec![0.0, 0.0],
            })
        }
    }

    #[test]
    fn reader_with_ragged_columns_follows_malformed_policy() {
        let files = vec![PathBuf::from("sky/a.fits")];
        let error = ingest_catalogs(&files, &Ragged, &linear, MalformedPolicy::Abort)
            .expect_err("ragged columns abort");
        assert_eq!(error.code(), "FORMAT.CATALOG_LENGTH");

        let outcome = ingest_catalogs(&files, &Ragged, &linear, MalformedPolicy::Skip)
            .expect("ragged columns skipped");
        assert_eq!(outcome.groups.len(), 1);
        assert!(outcome.groups[0].is_empty());
        assert_eq!(outcome.warnings.len(), 2);
    }
}
