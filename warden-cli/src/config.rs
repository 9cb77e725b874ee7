//! Configuration module
//!
//! Handles CLI configuration: where the daemon and the Telegram API live.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the warden daemon
    pub daemon_url: String,

    /// Base URL of the Telegram Bot API
    pub telegram_api_url: String,
}
