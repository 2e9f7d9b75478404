//! API handlers.

pub mod config;
pub mod health;
pub mod logs;
pub mod reminder;
pub mod stats;

pub use config::{get_config, get_config_status};
pub use health::health_check;
pub use logs::get_logs;
pub use reminder::{send_reminder, send_test_email};
pub use stats::get_stats;

use std::sync::Arc;

use crate::config::{Config, MessagesConfig};
use crate::mailer::{DeliveryPipeline, MailTransport, MessageComposer, Sender};
use crate::quota::HourlyQuotaCounter;
use crate::rate_limit::SlidingWindowLimiter;

/// Application state shared across handlers.
pub struct AppState {
    /// Delivery pipeline, which owns the hourly quota.
    pub pipeline: DeliveryPipeline,
    /// Per-client request limiter for the send endpoints.
    pub limiter: Arc<SlidingWindowLimiter>,
    /// Recipients of every send.
    pub recipients: Vec<String>,
    /// Subjects and bodies.
    pub messages: MessagesConfig,
    /// Sender address.
    pub sender_address: String,
    /// Relay as `host:port`.
    pub smtp_server: String,
    /// Whether the relay uses implicit TLS.
    pub use_ssl: bool,
    /// Settings still at their placeholder values.
    pub placeholders: Vec<&'static str>,
    /// Log file served by `/logs`.
    pub log_file: Option<String>,
}

impl AppState {
    /// Build the state from configuration and a mail transport.
    pub fn new(config: &Config, transport: Arc<dyn MailTransport>) -> Self {
        let sender = Sender::new(&config.mail.sender_name, &config.smtp.username);
        let composer = MessageComposer::new(sender, &config.mail.mailer_name);
        let quota = Arc::new(HourlyQuotaCounter::new(config.limits.max_emails_per_hour));

        Self {
            pipeline: DeliveryPipeline::new(composer, quota, transport),
            limiter: Arc::new(SlidingWindowLimiter::new(config.limits.rate_limit())),
            recipients: config.mail.recipients.clone(),
            messages: config.messages.clone(),
            sender_address: config.smtp.username.clone(),
            smtp_server: config.smtp.relay(),
            use_ssl: config.smtp.use_ssl,
            placeholders: config.placeholder_settings(),
            log_file: config.logging.file.clone(),
        }
    }

    /// The hourly email quota.
    pub fn quota(&self) -> &HourlyQuotaCounter {
        self.pipeline.quota()
    }
}
