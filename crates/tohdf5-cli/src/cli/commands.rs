use super::CliError;
use super::helpers::{default_output, finish_run, load_config};
use std::path::{Path, PathBuf};
use tohdf5_core::common::{ContainerConfig, ContainerFormat, MalformedPolicy};
use tohdf5_core::modules::{
    CsvCatalogReader, SimulationInput, expand_patterns, ingest_catalogs, ingest_simulation,
    ingest_tabular,
};
use tohdf5_core::numerics::FlatLambdaCdm;

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum PolicyArg {
    /// Stop at the first file that fails to decode
    Abort,
    /// Log the file and continue without it
    Skip,
}

impl From<PolicyArg> for MalformedPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Abort => Self::Abort,
            PolicyArg::Skip => Self::Skip,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum FormatArg {
    Json,
    Hdf5,
}

impl From<FormatArg> for ContainerFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Self::Json,
            FormatArg::Hdf5 => Self::Hdf5,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct OutputArgs {
    /// Output container path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Container format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Header/BoxSize attribute
    #[arg(long)]
    box_size: Option<f64>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl OutputArgs {
    fn apply(&self, container: &mut ContainerConfig) {
        if let Some(box_size) = self.box_size {
            container.box_size = box_size;
        }
        if let Some(format) = self.format {
            container.format = Some(format.into());
        }
    }

    fn output_path(&self, default_stem: &str) -> PathBuf {
        self.output.clone().unwrap_or_else(|| default_output(default_stem))
    }
}

#[derive(clap::Args)]
pub(super) struct CatalogArgs {
    /// Catalog files or glob patterns
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Redshift column name
    #[arg(long)]
    redshift_column: Option<String>,

    /// Right ascension column name (degrees)
    #[arg(long)]
    ra_column: Option<String>,

    /// Declination column name (degrees)
    #[arg(long)]
    dec_column: Option<String>,

    /// Hubble constant in km/s/Mpc
    #[arg(long)]
    hubble_constant: Option<f64>,

    /// Matter density parameter of the flat universe
    #[arg(long)]
    omega_matter: Option<f64>,

    /// Handling of catalogs that fail to parse
    #[arg(long, value_enum)]
    on_malformed: Option<PolicyArg>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
pub(super) struct TabularArgs {
    /// Table files or glob patterns; all rows land in PartType0
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Column indices as x,y,z[,radius[,luminosity]], e.g. 0,1,2,,3
    #[arg(long)]
    columns: Option<String>,

    /// Treat the first line as data instead of column names
    #[arg(long)]
    no_header: bool,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
pub(super) struct SimulationArgs {
    /// Snapshot directory, or snapshot files and glob patterns
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Maximum number of files merged per species
    #[arg(long)]
    max_files: Option<usize>,

    /// Species count every header is checked against (default: species discovered)
    #[arg(long)]
    expected_species: Option<usize>,

    /// Device centre to torus centre
    #[arg(long)]
    tokamak_radius: Option<f64>,

    /// Torus centre to boundary
    #[arg(long)]
    minor_radius: Option<f64>,

    /// Characters removed from the end of a file name to form the species
    #[arg(long)]
    suffix_len: Option<usize>,

    /// Keep a trailing `_<digits>` chunk index in the species name
    #[arg(long)]
    keep_index_token: bool,

    /// Handling of snapshots that fail to decode
    #[arg(long, value_enum)]
    on_malformed: Option<PolicyArg>,

    #[command(flatten)]
    output: OutputArgs,
}

impl SimulationArgs {
    fn input(&self) -> Result<SimulationInput, CliError> {
        if let [single] = self.inputs.as_slice() {
            let path = Path::new(single);
            if path.is_dir() {
                return Ok(SimulationInput::Directory(path.to_path_buf()));
            }
        }
        Ok(SimulationInput::Files(expand_patterns(&self.inputs)?))
    }
}

pub(super) fn run_catalog_command(args: CatalogArgs) -> Result<i32, CliError> {
    let mut config = load_config(args.output.config.as_deref())?;
    args.output.apply(&mut config.container);
    let catalog = &mut config.catalog;
    if let Some(name) = args.redshift_column {
        catalog.columns.redshift = name;
    }
    if let Some(name) = args.ra_column {
        catalog.columns.right_ascension = name;
    }
    if let Some(name) = args.dec_column {
        catalog.columns.declination = name;
    }
    if let Some(value) = args.hubble_constant {
        catalog.cosmology.hubble_constant = value;
    }
    if let Some(value) = args.omega_matter {
        catalog.cosmology.omega_matter = value;
    }
    if let Some(policy) = args.on_malformed {
        catalog.on_malformed = policy.into();
    }

    let files = expand_patterns(&args.inputs)?;
    let reader = CsvCatalogReader::new(config.catalog.columns.clone());
    let cosmology = FlatLambdaCdm::from(config.catalog.cosmology);
    let outcome = ingest_catalogs(&files, &reader, &cosmology, config.catalog.on_malformed)?;

    let output = args.output.output_path("boss");
    let report = outcome.commit(&output, &config.container)?;
    finish_run(&report, args.output.report.as_deref())
}

pub(super) fn run_tabular_command(args: TabularArgs) -> Result<i32, CliError> {
    let mut config = load_config(args.output.config.as_deref())?;
    args.output.apply(&mut config.container);
    if let Some(columns) = args.columns {
        config.tabular.columns = columns;
    }
    if args.no_header {
        config.tabular.has_header = false;
    }
    if let Some(delimiter) = args.delimiter {
        config.tabular.delimiter = delimiter;
    }

    let files = expand_patterns(&args.inputs)?;
    let outcome = ingest_tabular(&files, &config.tabular)?;

    let output = args.output.output_path("particles");
    let report = outcome.commit(&output, &config.container)?;
    finish_run(&report, args.output.report.as_deref())
}

pub(super) fn run_simulation_command(args: SimulationArgs) -> Result<i32, CliError> {
    let mut config = load_config(args.output.config.as_deref())?;
    args.output.apply(&mut config.container);
    let simulation = &mut config.simulation;
    if let Some(max_files) = args.max_files {
        simulation.max_files_per_species = max_files;
    }
    if let Some(expected) = args.expected_species {
        simulation.expected_species = Some(expected);
    }
    if let Some(radius) = args.tokamak_radius {
        simulation.tokamak_radius = radius;
    }
    if let Some(radius) = args.minor_radius {
        simulation.minor_radius = radius;
    }
    if let Some(suffix_len) = args.suffix_len {
        simulation.species_naming.suffix_len = suffix_len;
    }
    if args.keep_index_token {
        simulation.species_naming.strip_index_token = false;
    }
    if let Some(policy) = args.on_malformed {
        simulation.on_malformed = policy.into();
    }

    let input = args.input()?;
    let outcome = ingest_simulation(&input, &config.simulation)?;

    let output = args.output.output_path("orb5");
    let report = outcome.commit(&output, &config.container)?;
    finish_run(&report, args.output.report.as_deref())
}
