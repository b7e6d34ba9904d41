//! strata CLI entry point
//!
//! Parses arguments, initializes logging from the `[general]` section and
//! dispatches to the subcommand handlers. Errors are printed to stderr and
//! mapped to process exit codes via [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use strata_core::config::{GeneralConfig, StrataConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The config file may be missing or invalid; `config validate` reports that itself.
    let general = match StrataConfig::load(&cli.config).await {
        Ok(config) => config.general,
        Err(_) => GeneralConfig::default(),
    };
    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    strata_core::metrics::describe_metrics();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Layers(args) => commands::layers::execute(args, &cli.config, &writer).await,
        Commands::CacheKey(args) => {
            commands::cache_key::execute(args, &cli.config, &writer).await
        }
        Commands::Detect(args) => commands::detect::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
