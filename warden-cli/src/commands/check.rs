//! Setup check command
//!
//! Reports which daemon settings are present in the environment, whether the
//! daemon answers, and optionally sends a test notification.

use anyhow::Result;
use colored::*;
use warden_client::{TelegramClient, WardenClient};

use crate::config::Config;

const TEST_MESSAGE: &str = "🧪 Test message from VPS Workflow Automation";

/// One environment setting as seen by the check
#[derive(Debug, PartialEq, Eq)]
struct Setting {
    key: &'static str,
    value: Option<String>,
    required: bool,
    /// Print the value itself rather than just "Set"
    show_value: bool,
}

const SETTINGS: [(&str, bool, bool); 8] = [
    ("TELEGRAM_BOT_TOKEN", true, false),
    ("TELEGRAM_CHAT_ID", true, false),
    ("REPO_URL", false, true),
    ("WORKFLOW_INTERVAL_HOURS", false, true),
    ("WORKFLOW_DURATION_HOURS", false, true),
    ("GITHUB_OWNER", false, true),
    ("GITHUB_REPO", false, true),
    ("GITHUB_TOKEN", false, false),
];

fn collect_settings(lookup: impl Fn(&str) -> Option<String>) -> Vec<Setting> {
    SETTINGS
        .iter()
        .map(|&(key, required, show_value)| Setting {
            key,
            value: lookup(key).filter(|value| !value.trim().is_empty()),
            required,
            show_value,
        })
        .collect()
}

pub async fn run_checks(config: &Config, send_test: bool) -> Result<()> {
    println!("{}", "Warden Setup Check".bold());
    println!("{}", "═".repeat(60).dimmed());

    let settings = collect_settings(|key| std::env::var(key).ok());
    let mut healthy = print_settings(&settings);

    healthy &= check_daemon(config).await;

    if send_test {
        healthy &= send_test_message(config, &settings).await;
    }

    println!("{}", "═".repeat(60).dimmed());
    if healthy {
        println!("{}", "✓ All checks passed".green().bold());
        Ok(())
    } else {
        anyhow::bail!("Some checks failed, see above")
    }
}

/// Prints each setting; false if a required one is missing
fn print_settings(settings: &[Setting]) -> bool {
    println!();
    println!("{}", "Configuration".bold());

    let mut ok = true;
    for setting in settings {
        let shown = match (&setting.value, setting.show_value) {
            (Some(value), true) => value.normal(),
            (Some(_), false) => "Set".green(),
            (None, _) if setting.required => {
                ok = false;
                "Not Set (required for notifications)".red()
            }
            (None, _) => "Not Set (default)".dimmed(),
        };
        println!("  {:<26} {}", setting.key, shown);
    }
    ok
}

async fn check_daemon(config: &Config) -> bool {
    println!();
    println!("{}", "Daemon".bold());

    let client = WardenClient::new(&config.daemon_url);
    match client.status().await {
        Ok(status) => {
            println!(
                "  {} {} is up ({} runs so far)",
                "✓".green(),
                client.base_url(),
                status.total_runs
            );
            true
        }
        Err(e) => {
            println!("  {} {} unreachable: {}", "✗".red(), client.base_url(), e);
            false
        }
    }
}

async fn send_test_message(config: &Config, settings: &[Setting]) -> bool {
    println!();
    println!("{}", "Telegram".bold());

    let value = |key: &str| {
        settings
            .iter()
            .find(|setting| setting.key == key)
            .and_then(|setting| setting.value.clone())
    };
    let (Some(token), Some(chat_id)) = (value("TELEGRAM_BOT_TOKEN"), value("TELEGRAM_CHAT_ID"))
    else {
        println!(
            "  {} TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set to send a test message",
            "⚠".yellow()
        );
        return false;
    };

    let result = match TelegramClient::new(&config.telegram_api_url, &token) {
        Ok(client) => client.send_message(&chat_id, TEST_MESSAGE).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("  {} Test message sent, check your Telegram", "✓".green());
            true
        }
        Err(e) => {
            println!("  {} Failed to send Telegram message: {}", "✗".red(), e);
            false
        }
    }
}
