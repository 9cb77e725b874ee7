//! Service layer
//!
//! Collaborators the workflow core depends on, each behind a trait so the
//! scheduler, pipeline and poller can be exercised with scripted fakes:
//! - Notification delivery (Telegram)
//! - Shell command execution with a timeout
//! - Remote workflow run queries and dispatch (GitHub Actions)

mod command;
mod notifier;
mod remote;

// Re-export traits
pub use command::CommandRunner;
pub use remote::RemoteRuns;

// Re-export implementations
pub use command::{BackgroundProcess, CommandOutcome, ShellCommandRunner, WatchOutcome};
pub use notifier::{Notifications, TelegramSink};
pub use remote::GitHubRuns;
