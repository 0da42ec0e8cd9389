mod commands;
mod helpers;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use xrf_core::config::ConfigError;
use xrf_core::domain::XrfError;
use xrf_core::spectrum::SpectrumError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_xrf_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            if let Some(summary_line) = diagnostic.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            diagnostic.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.verbose);
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

/// Diagnostics go to stderr so reports on stdout stay machine-readable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(name = "xrf-fit", about = "XRF spectrum filtering and peak fitting")]
struct Cli {
    /// Log debug events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Filter and fit spectra with the series of a session config
    Fit(commands::FitArgs),
    /// Apply the filter chain of a session config and write the filtered spectra
    Filter(commands::FilterArgs),
    /// List transition series of the bundled peak table
    Catalog(commands::CatalogArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Fit(args) => commands::run_fit_command(args),
        CliCommand::Filter(args) => commands::run_filter_command(args),
        CliCommand::Catalog(args) => commands::run_catalog_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(XrfError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_xrf_error(&self) -> XrfError {
        match self {
            Self::Usage(message) => XrfError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => XrfError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<XrfError> for CliError {
    fn from(error: XrfError) -> Self {
        Self::Compute(error)
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::Compute(error.into())
    }
}

impl From<SpectrumError> for CliError {
    fn from(error: SpectrumError) -> Self {
        Self::Compute(error.into())
    }
}
