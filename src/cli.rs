use crate::constants::{
    CONNECT_RETRY_DELAY_MS, DEFAULT_TEMPERATURE, HISTORY_WINDOW, MAX_CONNECT_ATTEMPTS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the application
#[derive(Parser)]
#[command(version, about = "Chat relay with a fixed assistant persona")]
pub struct Cli {
    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    #[arg(long, global = true, default_value_t = String::from("info"))]
    pub logging_level: String,

    /// Also write logs to a daily rotating file under ./logs, named after the subcommand
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the relay HTTP server
    Serve {
        /// Port to listen on; overrides the PORT environment variable
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat with a running relay from the terminal
    Chat {
        /// Base URL of the relay
        #[arg(long, default_value = "http://localhost:3000")]
        relay_url: String,

        /// Sampling temperature sent with each message
        #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f64,

        /// Connectivity checks before giving up
        #[arg(long, default_value_t = MAX_CONNECT_ATTEMPTS)]
        max_connect_attempts: u32,

        /// Delay between connectivity checks, in milliseconds
        #[arg(long, default_value_t = CONNECT_RETRY_DELAY_MS)]
        retry_delay_ms: u64,

        /// Number of most recent messages sent with each request, capped at 10
        #[arg(long, default_value_t = HISTORY_WINDOW)]
        history_window: usize,

        /// Write the conversation as HTML to this file on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

impl Command {
    /// Log file used by this subcommand when `--log-file` is set
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Command::Serve { .. } => "chatrelay-serve.log",
            Command::Chat { .. } => "chatrelay-chat.log",
        }
    }
}
