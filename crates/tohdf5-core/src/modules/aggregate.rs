//! Per-type accumulation shared by every ingestion path.
//!
//! Buffers live in an insertion-ordered map, so the position of a key in the
//! map is its output index. Files are merged with an explicit fold.

use crate::domain::{
    Group, IngestError, IngestResult, IngestWarning, ParticleBatch, ParticleType, Provenance,
};
use indexmap::IndexMap;
use tracing::debug;

/// How type keys are derived, which also decides the provenance attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingRule {
    Species,
    Directory,
    Single,
}

impl GroupingRule {
    fn provenance(self, key: &str) -> Provenance {
        match self {
            Self::Species => Provenance::species(key),
            Self::Directory => Provenance::directory(key),
            Self::Single => Provenance::source(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Merged { index: usize },
    SkippedByCap { index: usize },
}

#[derive(Debug, Default)]
struct GroupBuffer {
    coordinates: Vec<[f64; 3]>,
    radius: Option<Vec<f64>>,
    luminosity: Option<Vec<f64>>,
    file_count: usize,
    skipped_files: usize,
}

impl GroupBuffer {
    fn merge(&mut self, key: &str, batch: ParticleBatch) -> IngestResult<()> {
        let particle_count = batch.coordinates.len();
        check_auxiliary_len(key, "Radius", batch.radius.as_deref(), particle_count)?;
        check_auxiliary_len(key, "Luminosity", batch.luminosity.as_deref(), particle_count)?;

        if self.file_count == 0 {
            self.radius = batch.radius;
            self.luminosity = batch.luminosity;
        } else {
            merge_auxiliary(key, "Radius", &mut self.radius, batch.radius)?;
            merge_auxiliary(key, "Luminosity", &mut self.luminosity, batch.luminosity)?;
        }
        self.coordinates.extend(batch.coordinates);
        self.file_count += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Aggregator {
    rule: GroupingRule,
    max_files_per_type: Option<usize>,
    buffers: IndexMap<String, GroupBuffer>,
}

impl Aggregator {
    pub fn new(rule: GroupingRule) -> Self {
        Self {
            rule,
            max_files_per_type: None,
            buffers: IndexMap::new(),
        }
    }

    pub fn species(max_files_per_species: usize) -> Self {
        Self::new(GroupingRule::Species).with_file_cap(max_files_per_species)
    }

    pub fn directories() -> Self {
        Self::new(GroupingRule::Directory)
    }

    pub fn with_file_cap(mut self, max_files_per_type: usize) -> Self {
        self.max_files_per_type = Some(max_files_per_type);
        self
    }

    /// Registers `key` if unseen and returns its output index.
    pub fn declare(&mut self, key: &str) -> usize {
        match self.buffers.get_index_of(key) {
            Some(index) => index,
            None => {
                let (index, _) = self.buffers.insert_full(key.to_string(), GroupBuffer::default());
                index
            }
        }
    }

    /// Whether one more file of `key` would still be merged under the cap.
    pub fn accepts(&self, key: &str) -> bool {
        let merged = self.buffers.get(key).map_or(0, |buffer| buffer.file_count);
        self.max_files_per_type.is_none_or(|max| merged < max)
    }

    /// Records a file of `key` that was left unread because the cap was reached.
    pub fn skip_file(&mut self, key: &str) -> usize {
        let index = self.declare(key);
        if let Some((_, buffer)) = self.buffers.get_index_mut(index) {
            buffer.skipped_files += 1;
        }
        index
    }

    pub fn append(&mut self, key: &str, batch: ParticleBatch) -> IngestResult<AppendOutcome> {
        let accepts = self.accepts(key);
        let index = self.declare(key);
        let Some((name, buffer)) = self.buffers.get_index_mut(index) else {
            return Err(IngestError::internal(
                "SYS.AGGREGATE_INDEX",
                format!("type '{}' vanished from the aggregation map", key),
            ));
        };

        if !accepts {
            buffer.skipped_files += 1;
            debug!(key = %name, "file cap reached, skipping file");
            return Ok(AppendOutcome::SkippedByCap { index });
        }

        buffer.merge(name, batch)?;
        Ok(AppendOutcome::Merged { index })
    }

    /// Folds `(key, batch)` pairs into the aggregator in iteration order.
    pub fn fold<I>(self, batches: I) -> IngestResult<Self>
    where
        I: IntoIterator<Item = (String, ParticleBatch)>,
    {
        batches.into_iter().try_fold(self, |mut aggregator, (key, batch)| {
            aggregator.append(&key, batch)?;
            Ok(aggregator)
        })
    }

    /// Closes every buffer. Types without data still get a group.
    pub fn finish(self) -> (Vec<Group>, Vec<IngestWarning>) {
        let mut groups = Vec::with_capacity(self.buffers.len());
        let mut warnings = Vec::new();

        for (index, (key, buffer)) in self.buffers.into_iter().enumerate() {
            if buffer.coordinates.is_empty() {
                warnings.push(IngestWarning::empty_data(format!(
                    "PartType{} ('{}') has no particles from {} file(s); writing an empty group",
                    index, key, buffer.file_count
                )));
            }
            if buffer.skipped_files > 0 {
                debug!(
                    key = %key,
                    skipped = buffer.skipped_files,
                    "files beyond the per-type cap were not read"
                );
            }

            groups.push(Group {
                provenance: Some(self.rule.provenance(&key)),
                particle_type: ParticleType::new(index, key),
                coordinates: buffer.coordinates,
                radius: buffer.radius,
                luminosity: buffer.luminosity,
                file_count: buffer.file_count,
            });
        }

        (groups, warnings)
    }
}

fn check_auxiliary_len(
    key: &str,
    dataset: &str,
    values: Option<&[f64]>,
    particle_count: usize,
) -> IngestResult<()> {
    match values {
        Some(values) if values.len() != particle_count => Err(IngestError::input_validation(
            "INPUT.AUXILIARY_LENGTH",
            format!(
                "type '{}': {} has {} values for {} particles",
                key,
                dataset,
                values.len(),
                particle_count
            ),
        )),
        _ => Ok(()),
    }
}

fn merge_auxiliary(
    key: &str,
    dataset: &str,
    accumulated: &mut Option<Vec<f64>>,
    incoming: Option<Vec<f64>>,
) -> IngestResult<()> {
    match (accumulated.as_mut(), incoming) {
        (Some(values), Some(incoming)) => {
            values.extend(incoming);
            Ok(())
        }
        (None, None) => Ok(()),
        _ => Err(IngestError::input_validation(
            "INPUT.AUXILIARY_MISMATCH",
            format!(
                "type '{}': {} is present in some files but not in others",
                key, dataset
            ),
        )),
    }
}
