//! botstat -- search bot traffic statistics from web server access logs

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use botstat_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let level = cli.requested_log_level().map(str::to_owned);
    let config_path = cli.config.as_deref();

    let command = match cli.command {
        // `config` reports load failures itself instead of failing up front.
        Commands::Config(args) => {
            let mut general = GeneralConfig::default();
            if let Some(level) = level {
                general.log_level = level;
            }
            logging::init_tracing(&general)?;
            return commands::config::execute(args, config_path, &writer).await;
        }
        command => command,
    };

    let mut config = commands::load_config(config_path).await?;
    if let Some(level) = level {
        config.general.log_level = level;
        config.validate()?;
    }
    logging::init_tracing(&config.general)?;

    tracing::debug!(config = %commands::config_source(config_path), "botstat starting");

    match command {
        Commands::Report(args) => commands::report::execute(args, config, &writer).await,
        Commands::Detect(args) => commands::detect::execute(args, config, &writer).await,
        Commands::Bots => commands::bots::execute(&config, &writer),
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}
