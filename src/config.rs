//! Configuration module for nudge.
//!
//! Configuration is read once at startup: an optional TOML file provides the
//! base values, and `NUDGE_*` environment variables (optionally loaded from a
//! `.env` file) override them.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::rate_limit::{RateLimitConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};
use crate::{NudgeError, Result};

/// Placeholder sender address shipped in the defaults.
pub const PLACEHOLDER_USERNAME: &str = "your_email@example.com";

/// Placeholder SMTP password shipped in the defaults.
pub const PLACEHOLDER_PASSWORD: &str = "your_app_password";

/// Placeholder recipient shipped in the defaults.
pub const PLACEHOLDER_RECIPIENT: &str = "recipient@example.com";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use `X-Forwarded-For` / `X-Real-IP` as the client identity.
    ///
    /// Only enable this behind a reverse proxy that sets these headers,
    /// otherwise clients can pick their own identity.
    #[serde(default)]
    pub trust_proxy_headers: bool,
    /// CORS allowed origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trust_proxy_headers: false,
            cors_origins: vec![],
        }
    }
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname.
    #[serde(default = "default_smtp_host")]
    pub host: String,
    /// Relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Implicit TLS when true, STARTTLS when false.
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
    /// Login name, also used as the sender address.
    #[serde(default = "default_username")]
    pub username: String,
    /// Login password.
    #[serde(default = "default_password")]
    pub password: SecretString,
    /// Timeout for each SMTP command, in seconds.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_use_ssl() -> bool {
    true
}

fn default_username() -> String {
    PLACEHOLDER_USERNAME.to_string()
}

fn default_password() -> SecretString {
    SecretString::new(PLACEHOLDER_PASSWORD.to_string())
}

fn default_smtp_timeout() -> u64 {
    30
}

impl SmtpConfig {
    /// Relay address as `host:port`.
    pub fn relay(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            use_ssl: default_use_ssl(),
            username: default_username(),
            password: default_password(),
            timeout_secs: default_smtp_timeout(),
        }
    }
}

/// Outgoing mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Display name of the sender.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Name reported in the `X-Mailer` header.
    #[serde(default = "default_mailer_name")]
    pub mailer_name: String,
    /// Recipient addresses.
    #[serde(default = "default_recipients")]
    pub recipients: Vec<String>,
}

fn default_sender_name() -> String {
    "Nudge".to_string()
}

fn default_mailer_name() -> String {
    "Nudge".to_string()
}

fn default_recipients() -> Vec<String> {
    vec![PLACEHOLDER_RECIPIENT.to_string()]
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            mailer_name: default_mailer_name(),
            recipients: default_recipients(),
        }
    }
}

/// Throttling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Emails allowed per rolling hour, across all clients.
    #[serde(default = "default_max_emails_per_hour")]
    pub max_emails_per_hour: u32,
    /// Requests allowed per client within `window_secs`.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Per-client sliding window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_emails_per_hour() -> u32 {
    crate::quota::DEFAULT_MAX_PER_HOUR
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

impl LimitsConfig {
    /// Per-client limiter settings.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_requests, self.window_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_emails_per_hour: default_max_emails_per_hour(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Subjects and bodies of the messages the service sends.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    /// Subject of the work reminder.
    #[serde(default = "default_reminder_subject")]
    pub reminder_subject: String,
    /// Body of the work reminder.
    #[serde(default = "default_reminder_body")]
    pub reminder_body: String,
    /// Subject of the deliverability test email.
    #[serde(default = "default_test_subject")]
    pub test_subject: String,
    /// Body of the deliverability test email.
    #[serde(default = "default_test_body")]
    pub test_body: String,
}

fn default_reminder_subject() -> String {
    "Work reminder".to_string()
}

fn default_reminder_body() -> String {
    "Don't forget to get some work done now!".to_string()
}

fn default_test_subject() -> String {
    "Nudge test".to_string()
}

fn default_test_body() -> String {
    "This is a test email to check deliverability.".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            reminder_subject: default_reminder_subject(),
            reminder_body: default_reminder_body(),
            test_subject: default_test_subject(),
            test_body: default_test_body(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. `None` logs to the console only.
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<String> {
    Some("logs/nudge.log".to_string())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// SMTP relay configuration.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Outgoing mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Throttling configuration.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Message templates.
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(NudgeError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file if it exists, then apply
    /// environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NudgeError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `NUDGE_HOST`, `NUDGE_PORT`: HTTP bind address
    /// - `NUDGE_SMTP_HOST`, `NUDGE_SMTP_PORT`, `NUDGE_SMTP_USE_SSL`: relay
    /// - `NUDGE_SMTP_USERNAME`, `NUDGE_SMTP_PASSWORD`: relay credentials
    /// - `NUDGE_SENDER_NAME`: sender display name
    /// - `NUDGE_RECIPIENTS`: comma-separated recipient list
    /// - `NUDGE_MAX_EMAILS_PER_HOUR`: hourly send cap
    /// - `NUDGE_LOG_LEVEL`, `NUDGE_LOG_FILE`: logging
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NUDGE_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("NUDGE_PORT") {
            self.server.port = parse_value("NUDGE_PORT", &v)?;
        }
        if let Some(v) = get("NUDGE_SMTP_HOST") {
            self.smtp.host = v;
        }
        if let Some(v) = get("NUDGE_SMTP_PORT") {
            self.smtp.port = parse_value("NUDGE_SMTP_PORT", &v)?;
        }
        if let Some(v) = get("NUDGE_SMTP_USE_SSL") {
            self.smtp.use_ssl = parse_bool("NUDGE_SMTP_USE_SSL", &v)?;
        }
        if let Some(v) = get("NUDGE_SMTP_USERNAME") {
            self.smtp.username = v.trim().to_string();
        }
        if let Some(v) = get("NUDGE_SMTP_PASSWORD") {
            self.smtp.password = SecretString::new(v);
        }
        if let Some(v) = get("NUDGE_SENDER_NAME") {
            self.mail.sender_name = v;
        }
        if let Some(v) = get("NUDGE_RECIPIENTS") {
            self.mail.recipients = parse_recipients(&v);
        }
        if let Some(v) = get("NUDGE_MAX_EMAILS_PER_HOUR") {
            self.limits.max_emails_per_hour = parse_value("NUDGE_MAX_EMAILS_PER_HOUR", &v)?;
        }
        if let Some(v) = get("NUDGE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("NUDGE_LOG_FILE") {
            self.logging.file = Some(v);
        }

        Ok(())
    }

    /// Settings that still hold their shipped placeholder values.
    ///
    /// The names are the environment variables that override them.
    pub fn placeholder_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.smtp.username == PLACEHOLDER_USERNAME {
            missing.push("NUDGE_SMTP_USERNAME");
        }
        if self.smtp.password.expose_secret() == PLACEHOLDER_PASSWORD {
            missing.push("NUDGE_SMTP_PASSWORD");
        }
        if self.mail.recipients.len() == 1 && self.mail.recipients[0] == PLACEHOLDER_RECIPIENT {
            missing.push("NUDGE_RECIPIENTS");
        }

        missing
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the SMTP host is empty
    /// - the SMTP username, which is also the sender address, is not an
    ///   email address
    /// - the per-client window is zero seconds
    pub fn validate(&self) -> Result<()> {
        if self.smtp.host.trim().is_empty() {
            return Err(NudgeError::Config("smtp.host must not be empty".to_string()));
        }
        if let Err(e) = self.smtp.username.parse::<lettre::Address>() {
            return Err(NudgeError::Config(format!(
                "smtp.username '{}' is used as the sender address and must be an email address: {e}",
                self.smtp.username
            )));
        }
        if self.limits.window_secs == 0 {
            return Err(NudgeError::Config(
                "limits.window_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NudgeError::Config(format!("{key}: invalid value '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(NudgeError::Config(format!("{key}: invalid value '{value}'"))),
    }
}

/// Split a comma-separated recipient list, trimming whitespace and dropping
/// empty entries.
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
