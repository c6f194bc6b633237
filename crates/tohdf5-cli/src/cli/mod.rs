mod commands;
mod helpers;

use clap::Parser;
use tohdf5_core::domain::IngestError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let ingest_error = error.as_ingest_error();
            eprintln!("{}", ingest_error.diagnostic_line());
            eprintln!("{}", ingest_error.fatal_exit_line());
            ingest_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("tohdf5".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose, cli.quiet);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "tohdf5",
    version,
    about = "Convert particle data into per-type columnar containers"
)]
struct Cli {
    /// Increase log detail (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert sky catalogs into one group per catalog directory
    Catalog(commands::CatalogArgs),
    /// Convert a delimited table into a single PartType0 group
    Tabular(commands::TabularArgs),
    /// Convert simulation snapshots into one group per species
    Simulation(commands::SimulationArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Catalog(args) => commands::run_catalog_command(args),
        CliCommand::Tabular(args) => commands::run_tabular_command(args),
        CliCommand::Simulation(args) => commands::run_simulation_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Ingest(IngestError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<IngestError> for CliError {
    fn from(error: IngestError) -> Self {
        Self::Ingest(error)
    }
}

impl CliError {
    fn as_ingest_error(&self) -> IngestError {
        match self {
            Self::Usage(message) => {
                IngestError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Ingest(error) => error.clone(),
            Self::Internal(error) => IngestError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
