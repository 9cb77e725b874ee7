//! Warden CLI
//!
//! Command-line interface for the warden daemon and its notification setup.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden workflow automation CLI", long_about = None)]
struct Cli {
    /// Daemon URL
    #[arg(
        long,
        env = "WARDEN_DAEMON_URL",
        default_value = "http://localhost:10000"
    )]
    daemon_url: String,

    /// Telegram Bot API URL
    #[arg(
        long,
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    telegram_api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        daemon_url: cli.daemon_url,
        telegram_api_url: cli.telegram_api_url,
    };

    handle_command(cli.command, &config).await
}
