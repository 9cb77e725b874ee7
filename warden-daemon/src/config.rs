//! Daemon configuration
//!
//! Defines every tunable of the service: the status API bind address, the
//! workflow pipeline (source repository, step timeouts, provisioning
//! commands), the periodic schedule, the notification sink and the remote
//! poller target.

use anyhow::Context;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;
use std::time::Duration;
use warden_client::RemoteTarget;

const SECS_PER_HOUR: u64 = 3600;

/// Upper bound for every configured interval and duration (ten years)
const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * SECS_PER_HOUR);

/// Commands of the best-effort provisioning step (cloudflared package install)
const PROVISIONING_COMMANDS: [&str; 4] = [
    "sudo mkdir -p --mode=0755 /usr/share/keyrings || true",
    "curl -fsSL https://pkg.cloudflare.com/cloudflare-public-v2.gpg | sudo tee /usr/share/keyrings/cloudflare-public-v2.gpg >/dev/null || true",
    "echo 'deb [signed-by=/usr/share/keyrings/cloudflare-public-v2.gpg] https://pkg.cloudflare.com/cloudflared any main' | sudo tee /etc/apt/sources.list.d/cloudflared.list || true",
    "sudo apt-get update && sudo apt-get install -y cloudflared || true",
];

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Status API bind host
    pub host: String,

    /// Status API bind port
    pub port: u16,

    /// Interval between periodic workflow triggers
    pub workflow_interval: Duration,

    /// Whether a workflow is triggered once at boot
    pub run_on_startup: bool,

    pub pipeline: PipelineConfig,

    pub telegram: TelegramConfig,

    pub poller: PollerConfig,
}

/// Workflow pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory under which each job gets its own working directory
    pub work_dir: PathBuf,

    /// Repository cloned by the first step
    pub repo_url: String,

    /// Best-effort provisioning commands, run in order
    pub provisioning_commands: Vec<String>,

    /// Optional setup script looked up at the root of the clone
    pub setup_script: String,

    /// Installs the tunnel helper
    pub tunnel_install_command: String,

    /// Starts the tunnel; its output is scanned for `tunnel_url_pattern`
    pub tunnel_command: String,

    pub tunnel_url_pattern: String,

    /// How long a job holds its session open after setup
    pub hold_duration: Duration,

    pub timeouts: StepTimeouts,
}

/// Per-step command timeouts
#[derive(Debug, Clone, Copy)]
pub struct StepTimeouts {
    pub clone: Duration,
    pub provisioning: Duration,
    pub setup_script: Duration,
    pub tunnel_install: Duration,
    pub tunnel_start: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            clone: Duration::from_secs(600),
            provisioning: Duration::from_secs(600),
            setup_script: Duration::from_secs(1800),
            tunnel_install: Duration::from_secs(300),
            tunnel_start: Duration::from_secs(60),
        }
    }
}

/// Telegram notification sink settings
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    /// Empty disables delivery; events are only logged
    pub chat_id: String,
}

/// Remote poller settings
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub api_url: String,
    pub target: RemoteTarget,
    pub poll_interval: Duration,
    /// Pause after a dispatch so the new run shows up before the next query
    pub dispatch_settle: Duration,
    pub autostart: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/workflow"),
            repo_url: "https://github.com/Arpitraj02/sapine-nodes-api".to_string(),
            provisioning_commands: PROVISIONING_COMMANDS.iter().map(|c| c.to_string()).collect(),
            setup_script: "install.sh".to_string(),
            tunnel_install_command: "curl -sSf https://sshx.io/get | sh || true".to_string(),
            tunnel_command: "sshx".to_string(),
            tunnel_url_pattern: r"https://sshx\.io/s/[a-zA-Z0-9#]+".to_string(),
            hold_duration: Duration::from_secs(5 * SECS_PER_HOUR),
            timeouts: StepTimeouts::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            target: RemoteTarget {
                git_ref: "main".to_string(),
                ..Default::default()
            },
            poll_interval: Duration::from_secs(300),
            dispatch_settle: Duration::from_secs(10),
            autostart: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            workflow_interval: Duration::from_secs(5 * SECS_PER_HOUR),
            run_on_startup: true,
            pipeline: PipelineConfig::default(),
            telegram: TelegramConfig::default(),
            poller: PollerConfig::default(),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Every variable is optional; unset values keep their defaults. Values
    /// that are set but malformed are errors.
    ///
    /// Recognized variables:
    /// - HOST, PORT
    /// - WORK_DIR, REPO_URL, SETUP_SCRIPT, TUNNEL_URL_PATTERN
    /// - WORKFLOW_INTERVAL_HOURS, WORKFLOW_DURATION_HOURS, RUN_ON_STARTUP
    /// - TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID, TELEGRAM_API_URL
    /// - GITHUB_TOKEN, GITHUB_OWNER, GITHUB_REPO, GITHUB_WORKFLOW, GITHUB_REF,
    ///   GITHUB_WORKFLOW_INPUTS, GITHUB_API_URL
    /// - POLL_INTERVAL_SECS, DISPATCH_SETTLE_SECS, POLLER_AUTOSTART
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.parse().context("PORT must be a port number")?;
        }
        if let Some(hours) = get("WORKFLOW_INTERVAL_HOURS") {
            config.workflow_interval = parse_hours(&hours, "WORKFLOW_INTERVAL_HOURS")?;
        }
        if let Some(flag) = get("RUN_ON_STARTUP") {
            config.run_on_startup = parse_bool(&flag, "RUN_ON_STARTUP")?;
        }

        let pipeline = &mut config.pipeline;
        if let Some(dir) = get("WORK_DIR") {
            pipeline.work_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("REPO_URL") {
            pipeline.repo_url = url;
        }
        if let Some(script) = get("SETUP_SCRIPT") {
            pipeline.setup_script = script;
        }
        if let Some(pattern) = get("TUNNEL_URL_PATTERN") {
            pipeline.tunnel_url_pattern = pattern;
        }
        if let Some(hours) = get("WORKFLOW_DURATION_HOURS") {
            pipeline.hold_duration = parse_hours(&hours, "WORKFLOW_DURATION_HOURS")?;
        }

        let telegram = &mut config.telegram;
        if let Some(url) = get("TELEGRAM_API_URL") {
            telegram.api_url = url;
        }
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            telegram.bot_token = token;
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID") {
            telegram.chat_id = chat_id;
        }

        let poller = &mut config.poller;
        if let Some(url) = get("GITHUB_API_URL") {
            poller.api_url = url;
        }
        if let Some(token) = get("GITHUB_TOKEN") {
            poller.target.token = token;
        }
        if let Some(owner) = get("GITHUB_OWNER") {
            poller.target.owner = owner;
        }
        if let Some(repo) = get("GITHUB_REPO") {
            poller.target.repo = repo;
        }
        if let Some(workflow) = get("GITHUB_WORKFLOW") {
            poller.target.workflow = workflow;
        }
        if let Some(git_ref) = get("GITHUB_REF") {
            poller.target.git_ref = git_ref;
        }
        if let Some(inputs) = get("GITHUB_WORKFLOW_INPUTS") {
            poller.target.inputs = parse_inputs(&inputs)?;
        }
        if let Some(secs) = get("POLL_INTERVAL_SECS") {
            poller.poll_interval = parse_secs(&secs, "POLL_INTERVAL_SECS")?;
        }
        if let Some(secs) = get("DISPATCH_SETTLE_SECS") {
            poller.dispatch_settle = parse_secs(&secs, "DISPATCH_SETTLE_SECS")?;
        }
        if let Some(flag) = get("POLLER_AUTOSTART") {
            poller.autostart = parse_bool(&flag, "POLLER_AUTOSTART")?;
        }

        Ok(config)
    }

    /// Address the status API listens on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workflow_interval.is_zero() {
            anyhow::bail!("workflow_interval must be greater than 0");
        }

        if self.pipeline.repo_url.is_empty() {
            anyhow::bail!("repo_url cannot be empty");
        }

        if self.pipeline.setup_script.contains('/') {
            anyhow::bail!("setup_script must be a file name, not a path");
        }

        Regex::new(&self.pipeline.tunnel_url_pattern)
            .context("tunnel_url_pattern is not a valid regular expression")?;

        for (name, url) in [
            ("telegram api_url", &self.telegram.api_url),
            ("github api_url", &self.poller.api_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.poller.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        for (name, duration) in [
            ("workflow_interval", self.workflow_interval),
            ("hold_duration", self.pipeline.hold_duration),
            ("poll_interval", self.poller.poll_interval),
            ("dispatch_settle", self.poller.dispatch_settle),
        ] {
            if duration > MAX_DURATION {
                anyhow::bail!(
                    "{} must be at most {} hours",
                    name,
                    MAX_DURATION.as_secs() / SECS_PER_HOUR
                );
            }
        }

        Ok(())
    }
}

impl PipelineConfig {
    /// Directory name of the clone, derived from the repository URL
    pub fn repo_name(&self) -> &str {
        let last = self
            .repo_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        last.strip_suffix(".git").unwrap_or(last)
    }

    /// Whole hours of the hold duration, for display
    pub fn hold_hours(&self) -> u64 {
        self.hold_duration.as_secs() / SECS_PER_HOUR
    }
}

fn parse_hours(value: &str, key: &str) -> anyhow::Result<Duration> {
    let hours: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of hours", key))?;
    let secs = hours
        .checked_mul(SECS_PER_HOUR)
        .with_context(|| format!("{} is out of range", key))?;
    Ok(Duration::from_secs(secs))
}

fn parse_secs(value: &str, key: &str) -> anyhow::Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds", key))?;
    Ok(Duration::from_secs(secs))
}

fn parse_bool(value: &str, key: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got '{}'", key, other),
    }
}

fn parse_inputs(value: &str) -> anyhow::Result<Map<String, JsonValue>> {
    match serde_json::from_str(value).context("GITHUB_WORKFLOW_INPUTS must be JSON")? {
        JsonValue::Object(map) => Ok(map),
        _ => anyhow::bail!("GITHUB_WORKFLOW_INPUTS must be a JSON object"),
    }
}
