//! Status command handler

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use warden_client::WardenClient;
use warden_core::domain::status::JobStatus;

use crate::config::Config;

/// Fetch and print the scheduler snapshot
pub async fn show_status(config: &Config) -> Result<()> {
    let client = WardenClient::new(&config.daemon_url);
    let status = client
        .status()
        .await
        .with_context(|| format!("Failed to reach daemon at {}", client.base_url()))?;

    print_status(&status);
    Ok(())
}

fn print_status(status: &JobStatus) {
    println!("{}", "Workflow Status".bold());
    println!("{}", "─".repeat(40).dimmed());

    let state = if status.is_running {
        "running".green().bold()
    } else {
        "idle".yellow()
    };
    println!("  State:        {}", state);

    if let Some(job_id) = &status.current_job_id {
        println!("  Current job:  {}", job_id.as_str().cyan());
    }
    if let Some(job_id) = &status.last_job_id {
        println!("  Last job:     {}", job_id);
    }
    println!("  Last run:     {}", format_time(status.last_run_time));
    println!("  Next run:     {}", format_time(status.next_run_time));
    println!();
    println!(
        "  Runs:         {} total, {} succeeded, {} failed",
        status.total_runs,
        status.successful_runs.to_string().green(),
        status.failed_runs.to_string().red()
    );
}

pub(crate) fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
