//! Warden HTTP Clients
//!
//! Type-safe HTTP clients used by the daemon and the CLI:
//!
//! - [`WardenClient`]: the daemon's own status API (used by the CLI)
//! - [`TelegramClient`]: Telegram Bot API, the notification transport
//! - [`GitHubClient`]: GitHub Actions workflow runs, polled by the remote poller
//!
//! # Example
//!
//! ```no_run
//! use warden_client::WardenClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), warden_client::ClientError> {
//!     let client = WardenClient::new("http://localhost:10000");
//!     let status = client.status().await?;
//!     println!("running: {}", status.is_running);
//!     Ok(())
//! }
//! ```

mod daemon;
pub mod error;
mod github;
mod http;
mod telegram;

pub use daemon::{TriggerOutcome, WardenClient};
pub use error::{ClientError, Result};
pub use github::{GitHubClient, RemoteTarget};
pub use telegram::TelegramClient;
