//! SiteLayers - site-analysis map viewer core
//!
//! Command-line front end: color lookups, headless map assembly, category
//! legends and configuration management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitelayers::cli::{CliError, ConfigArgs, InspectArgs, LegendArgs, StyleArgs};
use sitelayers::constants::APP_BINARY_NAME;

/// SiteLayers - load, style and inspect site-analysis map layers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the categorical color of attribute values
    Style(StyleArgs),
    /// Load all datasets and report the assembled map
    Inspect(InspectArgs),
    /// Print the category legend of a dataset
    Legend(LegendArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Style(args) => args.execute(),
        Command::Inspect(args) => args.execute(config).await,
        Command::Legend(args) => args.execute(config).await,
        Command::Config(args) => args.execute(config),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        eprintln!();
        eprintln!("For more options, run:");
        eprintln!("  {APP_BINARY_NAME} --help");
        std::process::exit(err.exit_code());
    }
}
