//! Poller command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use warden_client::WardenClient;
use warden_core::domain::remote::{PollerState, PollerStatus};

use crate::commands::status::format_time;
use crate::config::Config;

/// Poller subcommands
#[derive(Subcommand)]
pub enum PollerCommands {
    /// Start keeping a remote run alive
    Start,
    /// Stop polling after the current cycle
    Stop,
    /// Show the poller state and the last observed run
    Status,
}

pub async fn handle_poller_command(command: PollerCommands, config: &Config) -> Result<()> {
    let client = WardenClient::new(&config.daemon_url);

    match command {
        PollerCommands::Start => {
            let ack = client.start_poller().await?;
            println!("{} {}", "✓".green(), ack.message);
        }
        PollerCommands::Stop => {
            let ack = client.stop_poller().await?;
            println!("{} {}", "✓".green(), ack.message);
        }
        PollerCommands::Status => print_poller_status(&client.poller_status().await?),
    }

    Ok(())
}

fn print_poller_status(status: &PollerStatus) {
    let state = match status.state {
        PollerState::Polling => status.state.to_string().green().bold(),
        PollerState::Idle => status.state.to_string().yellow(),
        PollerState::Stopped => status.state.to_string().red(),
    };

    let run = &status.run;
    println!("{}", "Remote Poller".bold());
    println!("  State:        {}", state);
    println!(
        "  Last run:     {} ({})",
        run.run_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        run.status
    );
    println!("  Last check:   {}", format_time(run.last_checked_at));
    println!("  Checks:       {}", run.total_checks);
    println!("  Dispatched:   {}", run.triggered_count);
}
