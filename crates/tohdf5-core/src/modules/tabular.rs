//! Delimited text ingestion into a single `PartType0` group.

use crate::common::TabularConfig;
use crate::domain::{IngestError, IngestResult, IngestWarning, IngestionPath, ParticleBatch};
use crate::modules::aggregate::{Aggregator, GroupingRule};
use crate::modules::pipeline::{IngestOutcome, log_warnings, require_inputs};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COMMENT_MARKER: char = '#';

/// Zero-based column indices for each output quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub radius: Option<usize>,
    pub luminosity: Option<usize>,
}

impl ColumnMapping {
    /// Parses `x,y,z[,radius[,luminosity]]`; optional slots may be left empty
    /// (`0,1,2,,3` maps luminosity without radius).
    pub fn parse(text: &str) -> IngestResult<Self> {
        let tokens: Vec<&str> = text.split(',').map(str::trim).collect();
        if tokens.len() < 3 || tokens.len() > 5 {
            return Err(IngestError::input_validation(
                "INPUT.COLUMN_COUNT",
                format!(
                    "column mapping '{}' needs 3 to 5 entries (x,y,z[,radius[,luminosity]]), got {}",
                    text,
                    tokens.len()
                ),
            ));
        }

        let required = |slot: usize, name: &str| {
            parse_index(tokens[slot], text)?.ok_or_else(|| {
                IngestError::input_validation(
                    "INPUT.COLUMN_COUNT",
                    format!("column mapping '{}' leaves {} empty", text, name),
                )
            })
        };
        let optional = |slot: usize| match tokens.get(slot) {
            Some(token) => parse_index(token, text),
            None => Ok(None),
        };

        Ok(Self {
            x: required(0, "x")?,
            y: required(1, "y")?,
            z: required(2, "z")?,
            radius: optional(3)?,
            luminosity: optional(4)?,
        })
    }

    /// Number of fields a row needs to satisfy every mapped column.
    pub fn min_fields(&self) -> usize {
        [Some(self.x), Some(self.y), Some(self.z), self.radius, self.luminosity]
            .into_iter()
            .flatten()
            .max()
            .map_or(0, |max| max + 1)
    }

    fn extract(&self, fields: &[&str]) -> Option<([f64; 3], Option<f64>, Option<f64>)> {
        let value = |index: usize| fields.get(index)?.parse::<f64>().ok();
        let optional = |index: Option<usize>| match index {
            Some(index) => value(index).map(Some),
            None => Some(None),
        };
        Some((
            [value(self.x)?, value(self.y)?, value(self.z)?],
            optional(self.radius)?,
            optional(self.luminosity)?,
        ))
    }
}

fn parse_index(token: &str, text: &str) -> IngestResult<Option<usize>> {
    if token.is_empty() {
        return Ok(None);
    }
    token.parse::<usize>().map(Some).map_err(|_| {
        IngestError::input_validation(
            "INPUT.COLUMN_INDEX",
            format!("column mapping '{}': '{}' is not a column index", text, token),
        )
    })
}

/// Fields of one row with any trailing `#` comment removed.
fn strip_comment(record: &StringRecord) -> Vec<&str> {
    let mut fields = Vec::with_capacity(record.len());
    for field in record.iter() {
        match field.split_once(COMMENT_MARKER) {
            Some((before, _)) => {
                let before = before.trim();
                if !before.is_empty() {
                    fields.push(before);
                }
                break;
            }
            None => fields.push(field),
        }
    }
    fields
}

/// Reads one delimited file. Rows that are short or hold non-numbers in a
/// mapped column are dropped and reported in the returned warning.
pub fn read_tabular(
    path: &Path,
    mapping: &ColumnMapping,
    config: &TabularConfig,
) -> IngestResult<(ParticleBatch, Option<IngestWarning>)> {
    let delimiter = u8::try_from(config.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            IngestError::input_validation(
                "INPUT.DELIMITER",
                format!("delimiter '{}' is not a single ASCII character", config.delimiter),
            )
        })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(config.has_header)
        .delimiter(delimiter)
        .comment(Some(COMMENT_MARKER as u8))
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|error| csv_error(path, error))?;

    let mut batch = ParticleBatch {
        coordinates: Vec::new(),
        radius: mapping.radius.map(|_| Vec::new()),
        luminosity: mapping.luminosity.map(|_| Vec::new()),
    };
    let mut dropped_lines = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|error| csv_error(path, error))?;
        let fields = strip_comment(&record);
        if fields.iter().all(|field| field.is_empty()) {
            continue;
        }

        let Some((position, radius, luminosity)) = mapping.extract(&fields) else {
            let line = record.position().map_or(0, |position| position.line());
            debug!(path = %path.display(), line, "dropping row");
            dropped_lines.push(line);
            continue;
        };
        batch.coordinates.push(position);
        if let (Some(values), Some(value)) = (batch.radius.as_mut(), radius) {
            values.push(value);
        }
        if let (Some(values), Some(value)) = (batch.luminosity.as_mut(), luminosity) {
            values.push(value);
        }
    }

    let warning = dropped_lines.first().map(|first| {
        IngestWarning::empty_data(format!(
            "'{}': dropped {} row(s) that are shorter than {} fields or not numeric (first at line {})",
            path.display(),
            dropped_lines.len(),
            mapping.min_fields(),
            first
        ))
    });
    Ok((batch, warning))
}

fn csv_error(path: &Path, error: csv::Error) -> IngestError {
    let message = format!("failed to read table '{}': {}", path.display(), error);
    if error.is_io_error() {
        IngestError::io_system("IO.TABLE_READ", message)
    } else {
        IngestError::malformed_record("FORMAT.TABLE_CSV", message)
    }
}

/// Concatenates every file into `PartType0`, tagged with the source files.
pub fn ingest_tabular(files: &[PathBuf], config: &TabularConfig) -> IngestResult<IngestOutcome> {
    require_inputs(files, "tabular")?;
    let mapping = ColumnMapping::parse(&config.columns)?;
    let source = files
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut aggregator = Aggregator::new(GroupingRule::Single);
    aggregator.declare(&source);
    let mut warnings = Vec::new();
    for path in files {
        let (batch, warning) = read_tabular(path, &mapping, config)?;
        info!(path = %path.display(), rows = batch.len(), "read table");
        warnings.extend(warning);
        aggregator.append(&source, batch)?;
    }

    let (groups, finish_warnings) = aggregator.finish();
    warnings.extend(finish_warnings);
    log_warnings(&warnings);
    Ok(IngestOutcome {
        path: IngestionPath::Tabular,
        groups,
        warnings,
    })
}
