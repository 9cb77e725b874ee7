//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod chat_id;
mod check;
mod poller;
mod status;
mod trigger;

pub use poller::PollerCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the workflow scheduler status
    Status,
    /// Start a workflow now
    Trigger,
    /// Remote run poller control
    Poller {
        #[command(subcommand)]
        command: PollerCommands,
    },
    /// Discover Telegram chat ids the bot has seen
    ChatId {
        /// Bot token from @BotFather
        bot_token: String,
    },
    /// Check the daemon environment and optionally send a test notification
    Check {
        /// Send a test message to TELEGRAM_CHAT_ID
        #[arg(long)]
        send_test: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Status => status::show_status(config).await,
        Commands::Trigger => trigger::trigger_workflow(config).await,
        Commands::Poller { command } => poller::handle_poller_command(command, config).await,
        Commands::ChatId { bot_token } => chat_id::list_chats(config, &bot_token).await,
        Commands::Check { send_test } => check::run_checks(config, send_test).await,
    }
}
