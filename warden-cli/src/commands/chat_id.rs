//! Chat discovery command
//!
//! Lists the chats that have messaged the bot so their id can be put in
//! TELEGRAM_CHAT_ID.

use anyhow::{Context, Result};
use colored::*;
use std::collections::HashSet;
use warden_client::TelegramClient;
use warden_core::dto::telegram::{Chat, Update};

use crate::config::Config;

pub async fn list_chats(config: &Config, bot_token: &str) -> Result<()> {
    let client = TelegramClient::new(&config.telegram_api_url, bot_token)?;
    let updates = client
        .get_updates()
        .await
        .context("Error connecting to Telegram, check the bot token")?;

    let chats = distinct_chats(&updates);
    if chats.is_empty() {
        println!("{}", "✗ No messages found!".red());
        println!();
        println!("To get your chat ID:");
        println!("  1. Start a chat with your bot on Telegram");
        println!("  2. Send any message to the bot");
        println!("  3. Run this command again");
        println!();
        println!("{}", "Or use @userinfobot on Telegram to get your chat ID directly.".dimmed());
        return Ok(());
    }

    println!("{}", "✓ Found chat messages!".green());
    println!();
    for chat in chats {
        print_chat(chat);
    }
    println!("Add one of these chat IDs to your environment:");
    println!("  {}", "TELEGRAM_CHAT_ID=<your_chat_id>".cyan());

    Ok(())
}

/// Chats in first-seen order, each once
fn distinct_chats(updates: &[Update]) -> Vec<&Chat> {
    let mut seen = HashSet::new();
    updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .map(|message| &message.chat)
        .filter(|chat| seen.insert(chat.id))
        .collect()
}

fn print_chat(chat: &Chat) {
    if chat.is_private() {
        println!("  {} Private Chat", "▸".cyan());
        println!("    Name:     {}", chat.display_name());
        println!("    Username: @{}", chat.username.as_deref().unwrap_or("N/A"));
    } else {
        println!(
            "  {} Group Chat: {}",
            "▸".cyan(),
            chat.title.as_deref().unwrap_or("Unknown").bold()
        );
    }
    println!("    Chat ID:  {}", chat.id.to_string().bold());
    println!();
}
