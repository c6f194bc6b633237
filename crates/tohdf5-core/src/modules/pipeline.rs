use crate::common::{ContainerConfig, ContainerFormat, MalformedPolicy};
use crate::domain::{
    ContainerHeader, Group, GroupSummary, IngestError, IngestReport, IngestResult, IngestWarning,
    IngestionPath,
};
use crate::modules::container::commit_container;
use std::path::Path;
use tracing::warn;

/// Finalized groups of one run, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub path: IngestionPath,
    pub groups: Vec<Group>,
    pub warnings: Vec<IngestWarning>,
}

impl IngestOutcome {
    pub fn summaries(&self) -> Vec<GroupSummary> {
        self.groups.iter().map(GroupSummary::from).collect()
    }

    /// Persists every group at once and returns the run report.
    pub fn commit(self, output: &Path, container: &ContainerConfig) -> IngestResult<IngestReport> {
        let format = resolve_format(output, container);
        let header = ContainerHeader {
            box_size: container.box_size,
        };
        commit_container(output, format, &header, &self.groups)?;

        Ok(IngestReport {
            path: self.path,
            output_path: output.to_path_buf(),
            groups: self.summaries(),
            warnings: self.warnings,
        })
    }
}

pub fn resolve_format(output: &Path, container: &ContainerConfig) -> ContainerFormat {
    container
        .format
        .or_else(|| ContainerFormat::from_extension(output))
        .unwrap_or_default()
}

pub(crate) fn require_inputs<T>(inputs: &[T], what: &str) -> IngestResult<()> {
    if inputs.is_empty() {
        return Err(IngestError::input_validation(
            "INPUT.NO_FILES",
            format!("no {} input files were provided", what),
        ));
    }
    Ok(())
}

/// Applies the malformed-input policy to a failed per-file step.
///
/// Only malformed-record errors are eligible for skipping; I/O and input
/// errors always abort.
pub(crate) fn handle_file_error(
    error: IngestError,
    policy: MalformedPolicy,
    warnings: &mut Vec<IngestWarning>,
) -> IngestResult<()> {
    if policy == MalformedPolicy::Skip && error.is_malformed_record() {
        warn!(code = error.code(), "skipping file: {}", error.message());
        warnings.push(IngestWarning::skipped_file(error.message()));
        return Ok(());
    }
    Err(error)
}

pub(crate) fn log_warnings(warnings: &[IngestWarning]) {
    for warning in warnings {
        warn!(code = warning.code, "{}", warning.message);
    }
}
