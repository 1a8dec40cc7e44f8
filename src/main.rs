mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use tubefetch::config::Config;
use tubefetch::observability;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = Config::load_with_override(cli.config)
        .map_err(|e| format!("Failed to load config: {}", e))?;
    observability::init_tracing(&config.telemetry.log_filter);

    match cli.command {
        Commands::Server(args) => commands::server(config, args).await,
        Commands::Fetch(args) => commands::fetch(config, args).await,
        Commands::Probe(args) => commands::probe(config, args).await,
    }
}
