//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Target;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetching and scheduling settings
    #[serde(default)]
    pub poller: PollerConfig,

    /// History retention settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Telegram notifier credentials
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Monitored listing pages
    #[serde(default = "defaults::targets")]
    pub targets: Vec<Target>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults only when the file is missing.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path).map_err(|e| {
            AppError::config(format!("Cannot load {}: {}", path.display(), e))
        })
    }

    /// Apply overrides from the process environment, reading `.env` first.
    pub fn apply_process_env(&mut self) {
        let _ = dotenvy::dotenv();
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply environment-style overrides through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        override_parsed(&lookup, "POLL_INTERVAL_MS", &mut self.poller.poll_interval_ms);
        override_parsed(&lookup, "TIMEOUT_MS", &mut self.poller.timeout_ms);
        override_parsed(&lookup, "FETCH_RETRIES", &mut self.poller.retries);
        override_parsed(
            &lookup,
            "RETRY_CLIENT_ERRORS",
            &mut self.poller.retry_client_errors,
        );
        override_parsed(&lookup, "HISTORY_SIZE", &mut self.history.history_size);
        override_parsed(&lookup, "RETENTION_DAYS", &mut self.history.retention_days);

        if let Some(user_agent) = lookup("USER_AGENT") {
            self.poller.user_agent = user_agent;
        }
        if let Some(data_path) = lookup("DATA_PATH") {
            self.paths.data_dir = PathBuf::from(data_path);
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.poller.user_agent.trim().is_empty() {
            return Err(AppError::validation("poller.user_agent is empty"));
        }
        if self.poller.timeout_ms == 0 {
            return Err(AppError::validation("poller.timeout_ms must be > 0"));
        }
        if self.history.history_size == 0 {
            return Err(AppError::validation("history.history_size must be > 0"));
        }
        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(AppError::validation("target.name is empty"));
            }
            if target.url.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "target '{}' has an empty url",
                    target.name
                )));
            }
            if target.output.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "target '{}' has an empty output",
                    target.name
                )));
            }
            if target.selectors.all().any(|s| s.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "target '{}' has an empty selector",
                    target.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poller: PollerConfig::default(),
            history: HistoryConfig::default(),
            paths: PathsConfig::default(),
            telegram: TelegramConfig::default(),
            targets: defaults::targets(),
        }
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    slot: &mut T,
) {
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => log::warn!("Ignoring invalid {name}={raw:?}"),
        }
    }
}

/// HTTP fetching and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay before the next cycle after one completes
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Per-attempt request timeout
    #[serde(default = "defaults::timeout")]
    pub timeout_ms: u64,

    /// Attempts per fetch
    #[serde(default = "defaults::retries")]
    pub retries: u32,

    /// Retry 4xx responses like any other failure
    #[serde(default = "defaults::retry_client_errors")]
    pub retry_client_errors: bool,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval(),
            timeout_ms: defaults::timeout(),
            retries: defaults::retries(),
            retry_client_errors: defaults::retry_client_errors(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// History retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum records kept per target
    #[serde(default = "defaults::history_size")]
    pub history_size: usize,

    /// Declared retention window. Not enforced; only the size cap evicts.
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_size: defaults::history_size(),
            retention_days: defaults::retention_days(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one snapshot file per target
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Telegram Bot API credentials. Missing values disable delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    /// Token and chat id, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::Target;

    // Poller defaults
    pub fn poll_interval() -> u64 {
        30_000
    }
    pub fn timeout() -> u64 {
        10_000
    }
    pub fn retries() -> u32 {
        3
    }
    pub fn retry_client_errors() -> bool {
        true
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".into()
    }

    // History defaults
    pub fn history_size() -> usize {
        1000
    }
    pub fn retention_days() -> u32 {
        30
    }

    // Path defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }

    // Target defaults
    pub fn targets() -> Vec<Target> {
        vec![Target::vacancies(), Target::tasks()]
    }
}
