//! Configuration schema definitions.
//!
//! ```toml
//! [bot]
//! token = "123456:ABC-DEF"
//! command_delimiter = "/"
//! request_timeout = "30s"
//!
//! [polling]
//! interval = "15s"
//! initial_delay = "3s"
//!
//! # Presence of this table switches from polling to webhook delivery.
//! [webhook]
//! url = "https://bot.example.com/hooks/telegram"
//! listen = "0.0.0.0:8443"
//! path = "/hooks/telegram"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//!
//! [logging.filters]
//! gramkit_transport = "debug"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gramkit_core::DEFAULT_DELIMITER;
use gramkit_transport::{FailurePolicy, PollingConfig};

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GramkitConfig {
    #[serde(default)]
    pub bot: BotSettings,

    /// Webhook delivery. When absent the runtime polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookSettings>,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GramkitConfig {
    /// Returns `true` if updates are delivered through a webhook.
    pub fn uses_webhook(&self) -> bool {
        self.webhook.is_some()
    }
}

// =============================================================================
// Bot
// =============================================================================

/// Bot identity and outbound API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Bot API token.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_delimiter")]
    pub command_delimiter: char,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout. Must exceed `polling.long_poll_timeout`.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            command_delimiter: default_delimiter(),
            api_base_url: default_api_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSettings")
            .field("token", &"<redacted>")
            .field("command_delimiter", &self.command_delimiter)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

// =============================================================================
// Webhook
// =============================================================================

/// Webhook receiver settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// Public url registered with `setWebhook`.
    pub url: String,

    /// Local socket address the receiver binds.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Local route path. Usually the path component of `url`.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Process deliveries one at a time.
    #[serde(default = "default_true")]
    pub serialize: bool,

    /// Secret the platform echoes back on every delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl WebhookSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            listen: default_listen(),
            path: default_webhook_path(),
            serialize: true,
            secret_token: None,
        }
    }
}

impl fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("url", &self.url)
            .field("listen", &self.listen)
            .field("path", &self.path)
            .field("serialize", &self.serialize)
            .field("secret_token", &self.secret_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_listen() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Polling
// =============================================================================

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_long_poll_timeout", with = "humantime_serde")]
    pub long_poll_timeout: Duration,

    /// Maximum updates per fetch, 1 to 100.
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            initial_delay: default_initial_delay(),
            long_poll_timeout: default_long_poll_timeout(),
            limit: default_limit(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl From<&PollingSettings> for PollingConfig {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval,
            initial_delay: settings.initial_delay,
            long_poll_timeout: settings.long_poll_timeout,
            limit: settings.limit,
            failure_policy: settings.failure_policy,
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_long_poll_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_limit() -> u32 {
    100
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to `file_path`.
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `gramkit_transport = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    /// Log span creation and close, e.g. the per-update span.
    #[serde(default)]
    pub span_lifecycle: bool,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,
}
