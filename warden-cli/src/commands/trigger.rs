//! Trigger command handler

use anyhow::Result;
use colored::*;
use warden_client::{TriggerOutcome, WardenClient};

use crate::config::Config;

/// Ask the daemon to start a workflow
pub async fn trigger_workflow(config: &Config) -> Result<()> {
    let client = WardenClient::new(&config.daemon_url);

    match client.trigger().await? {
        TriggerOutcome::Accepted(accepted) => {
            println!("{} {}", "✓".green(), accepted.message);
            println!("  Workflow ID: {}", accepted.workflow_id.as_str().cyan());
        }
        TriggerOutcome::Conflict(conflict) => {
            println!("{} {}", "⚠".yellow(), conflict.error.yellow());
            if let Some(current) = conflict.current_workflow {
                println!("  Running: {}", current.as_str().cyan());
            }
        }
    }

    Ok(())
}
