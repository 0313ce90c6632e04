//! Main entry point for the application.
//!
//! This module initializes logging, loads environment variables and configuration,
//! and dispatches to one of two modes:
//! - `serve`: the completion relay HTTP server
//! - `chat`: an interactive terminal session against a running relay

mod api;
mod cli;
mod client;
mod config;
mod constants;
mod errors;
mod llm;
mod protocol;
mod relay;
mod utils;

use clap::Parser;
use cli::{Cli, Command};
use config::ClientConfig;
use errors::Error;
use std::time::Duration;
use tracing::{error, warn};

/// Main entry point that initializes and runs the application.
///
/// # Initialization steps:
/// 1. Parse CLI arguments
/// 2. Initialize logging system
/// 3. Load environment variables
/// 4. Run the selected subcommand
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_file = cli.log_file.then(|| cli.command.log_file_name());
    utils::init_logging(&cli.logging_level, log_file);

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    if let Err(e) = run(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Serve { port } => {
            let mut config = config::load_relay_config()?;
            if let Some(port) = port {
                config.port = port;
            }
            api::server::launch_server(config).await
        }
        Command::Chat {
            relay_url,
            temperature,
            max_connect_attempts,
            retry_delay_ms,
            history_window,
            transcript,
        } => {
            let config = ClientConfig {
                relay_url,
                temperature,
                max_connect_attempts,
                retry_delay: Duration::from_millis(retry_delay_ms),
                history_window,
            };
            client::run_chat(config, transcript.as_deref()).await
        }
    }
}
