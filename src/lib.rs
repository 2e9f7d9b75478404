//! nudge - reminder mailer
//!
//! A small HTTP service that sends templated reminder emails to a configured
//! recipient list, throttled per client and capped per hour.

pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod quota;
pub mod rate_limit;
pub mod validation;
pub mod web;

pub use config::Config;
pub use error::{NudgeError, Result};
pub use mailer::{
    DeliveryError, DeliveryOutcome, DeliveryPipeline, MailSession, MailTransport,
    MessageComposer, OutboundMessage, SendFailure, Sender, SmtpRelay,
};
pub use quota::{HourlyQuotaCounter, QuotaSnapshot};
pub use rate_limit::{RateLimitConfig, RateLimitResult, SlidingWindowLimiter};
pub use validation::{is_valid_email, validate_email, EmailError};
pub use web::{AppState, WebServer};
