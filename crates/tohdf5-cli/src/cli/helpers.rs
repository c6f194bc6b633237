use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tohdf5_core::common::IngestConfig;
use tohdf5_core::domain::IngestReport;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `RUST_LOG` wins over the verbosity flags.
pub(super) fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second run in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn load_config(path: Option<&Path>) -> Result<IngestConfig, CliError> {
    match path {
        Some(path) => {
            debug!(config = %path.display(), "loading configuration");
            Ok(IngestConfig::load(path)?)
        }
        None => {
            debug!("no configuration file, using built-in defaults");
            Ok(IngestConfig::default())
        }
    }
}

/// `<stem>.hdf5` when the HDF5 backend is compiled in, `<stem>.json` otherwise.
pub(super) fn default_output(stem: &str) -> PathBuf {
    let extension = if cfg!(feature = "hdf5") { "hdf5" } else { "json" };
    PathBuf::from(format!("{}.{}", stem, extension))
}

pub(super) fn write_report(path: &Path, report: &IngestReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    let encoded = serde_json::to_string_pretty(report).context("failed to encode run report")?;
    fs::write(path, encoded)
        .with_context(|| format!("failed to write run report '{}'", path.display()))?;
    Ok(())
}

pub(super) fn finish_run(
    report: &IngestReport,
    report_path: Option<&Path>,
) -> Result<i32, CliError> {
    println!("{}", report.render_human_summary());
    if let Some(path) = report_path {
        write_report(path, report)?;
        info!(report = %path.display(), "run report written");
        println!("JSON report: {}", path.display());
    }
    Ok(0)
}
