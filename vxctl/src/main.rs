//! Command-line harness for the VertexFlow Vertex AI node

use clap::Parser;
use std::process;
use tracing::{error, info, Level};

mod cli;
mod commands;
mod config;
mod error;
mod input;
mod output;

use cli::*;
use config::VxctlConfig;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match VxctlConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let config = config.with_overrides(&args);

    info!("Starting vxctl in region {}", config.region);

    let result = match args.command {
        Commands::Run(run_args) => commands::run::handle_run_command(run_args, &config).await,
        Commands::Preview(node_args) => {
            commands::preview::handle_preview_command(node_args, &config).await
        }
        Commands::Models => commands::models::handle_models_command(&config).await,
    };

    match result {
        Ok(_) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}
