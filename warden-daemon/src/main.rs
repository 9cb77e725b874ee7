//! Warden Daemon
//!
//! Periodically provisions a disposable remote session: clones a repository,
//! installs helpers, opens a tunnel and holds the session open, reporting
//! every step to a Telegram chat.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Services: Collaborators (shell commands, notifications, remote CI API)
//! - Pipeline: The fixed step sequence of one workflow job
//! - Scheduler: Single-flight job triggers and the remote run poller
//! - API: Thin HTTP status and control surface

mod api;
mod config;
mod pipeline;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_client::GitHubClient;

use crate::api::AppState;
use crate::config::Config;
use crate::pipeline::WorkflowExecutor;
use crate::scheduler::{JobScheduler, PollerSettings, RemotePoller, timer};
use crate::service::{GitHubRuns, Notifications, ShellCommandRunner, TelegramSink};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden_daemon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden Daemon");

    let config = load_config()?;
    info!(
        "Loaded configuration: repo_url={}, work_dir={}, interval={}h",
        config.pipeline.repo_url,
        config.pipeline.work_dir.display(),
        config.workflow_interval.as_secs() / 3600
    );

    // Notifications are delivered by their own task
    let sink = Arc::new(TelegramSink::new(&config.telegram));
    let (notifications, _dispatcher) = Notifications::spawn(sink);

    let executor = WorkflowExecutor::new(
        config.pipeline.clone(),
        Arc::new(ShellCommandRunner),
        notifications,
    )
    .context("Failed to initialize workflow executor")?;

    let scheduler = JobScheduler::new(Arc::new(executor));
    let _timer = timer::spawn_periodic(scheduler.clone(), config.workflow_interval);

    if config.run_on_startup {
        info!("Running initial workflow on startup");
        scheduler.trigger_on_startup();
    }

    let remote = GitHubRuns::new(GitHubClient::new(config.poller.api_url.clone()));
    let poller = RemotePoller::new(Arc::new(remote), PollerSettings::from(&config.poller));

    if config.poller.autostart {
        match poller.start() {
            Ok(_) => info!("Remote poller started"),
            Err(e) => warn!("Remote poller not started: {}", e),
        }
    }

    let app = api::create_router(AppState { scheduler, poller });

    let addr = config.bind_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e).context("Failed to run server");
    }

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({:#}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
