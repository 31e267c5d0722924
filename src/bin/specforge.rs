//! specforge CLI Binary
//!
//! Read-only front end over the orchestration library: change reports,
//! affected files, per-file context, validation and state reset.

use anyhow::Context;
use clap::Parser;
use specforge::cli::{map_error, Cli, RunContext};
use specforge::config::ConfigLoader;
use specforge::error::ApiError;
use specforge::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("specforge CLI starting");

    match run(&cli) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            match e.downcast_ref::<ApiError>() {
                Some(api) => eprintln!("{}", map_error(api)),
                None => eprintln!("{:#}", e),
            }
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())
        .context("Error initializing workspace")?;
    Ok(context.execute(&cli.command)?)
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    }
    .map(|c| c.logging)
    .unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    config
}
