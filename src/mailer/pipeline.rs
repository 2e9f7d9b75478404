//! Multi-recipient delivery.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use thiserror::Error;

use super::compose::{ComposeError, MessageComposer};
use super::transport::{MailTransport, SendFailure};
use crate::quota::HourlyQuotaCounter;
use crate::validation::validate_email;

/// Result of delivering to one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryOutcome {
    /// The relay accepted the message.
    Sent,
    /// The recipient address is malformed; nothing was transmitted.
    InvalidAddress,
    /// The hourly quota was used up before the batch started.
    QuotaExceeded,
    /// The relay rejected our credentials.
    AuthFailed,
    /// The relay refused the recipient.
    RecipientRefused,
    /// The relay refused the sender.
    SenderRefused,
    /// Connection, TLS or protocol failure talking to the relay.
    TransportError,
    /// Anything else, including messages that could not be assembled.
    UnexpectedError,
}

impl DeliveryOutcome {
    /// Stable label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::InvalidAddress => "invalid_address",
            DeliveryOutcome::QuotaExceeded => "quota_exceeded",
            DeliveryOutcome::AuthFailed => "auth_failed",
            DeliveryOutcome::RecipientRefused => "recipient_refused",
            DeliveryOutcome::SenderRefused => "sender_refused",
            DeliveryOutcome::TransportError => "transport_error",
            DeliveryOutcome::UnexpectedError => "unexpected_error",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SendFailure> for DeliveryOutcome {
    fn from(failure: &SendFailure) -> Self {
        match failure {
            SendFailure::Authentication(_) => DeliveryOutcome::AuthFailed,
            SendFailure::RecipientRefused(_) => DeliveryOutcome::RecipientRefused,
            SendFailure::SenderRefused(_) => DeliveryOutcome::SenderRefused,
            SendFailure::Transport(_) => DeliveryOutcome::TransportError,
            SendFailure::Unexpected(_) => DeliveryOutcome::UnexpectedError,
        }
    }
}

/// Failures that end a send call and are reported to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The hourly email quota is used up.
    #[error("hourly email limit reached")]
    QuotaExceeded {
        /// When the current quota window ends.
        resets_at: Option<DateTime<Local>>,
    },

    /// The relay rejected the configured credentials.
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    /// The configured sender address is not a valid mailbox.
    #[error("{0}")]
    InvalidSender(String),
}

/// Per-call tally, logged once the batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    /// Recipients a transmission was attempted for.
    pub attempted: usize,
    /// Recipients the relay accepted.
    pub sent: usize,
    /// Transmissions that failed.
    pub failed: usize,
    /// Recipients skipped before transmission.
    pub skipped: usize,
}

impl DeliverySummary {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent => {
                self.attempted += 1;
                self.sent += 1;
            }
            DeliveryOutcome::InvalidAddress | DeliveryOutcome::QuotaExceeded => {
                self.skipped += 1;
            }
            _ => {
                self.attempted += 1;
                self.failed += 1;
            }
        }
    }
}

/// Sends one message to each of a list of recipients.
///
/// Each call consumes one unit of the hourly quota regardless of how many
/// recipients it has. A bad recipient is logged and skipped. The batch stops
/// only on failures that would repeat for every recipient: the relay
/// rejecting our credentials, or a sender address that cannot be parsed.
pub struct DeliveryPipeline {
    composer: MessageComposer,
    quota: Arc<HourlyQuotaCounter>,
    transport: Arc<dyn MailTransport>,
}

impl DeliveryPipeline {
    /// Create a new pipeline.
    pub fn new(
        composer: MessageComposer,
        quota: Arc<HourlyQuotaCounter>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            composer,
            quota,
            transport,
        }
    }

    /// The composer used for every message.
    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    /// The shared quota counter.
    pub fn quota(&self) -> &Arc<HourlyQuotaCounter> {
        &self.quota
    }

    /// Send `subject`/`body` to every address in `recipients`.
    pub async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<DeliverySummary, DeliveryError> {
        if !self.quota.try_consume() {
            let resets_at = self.quota.snapshot().resets_at;
            tracing::warn!(
                outcome = DeliveryOutcome::QuotaExceeded.as_str(),
                recipients = recipients.len(),
                "Send rejected by hourly quota"
            );
            return Err(DeliveryError::QuotaExceeded { resets_at });
        }

        let mut summary = DeliverySummary::default();

        for recipient in recipients {
            match self.deliver_one(subject, body, recipient).await {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    if let DeliveryError::Authentication(_) = err {
                        summary.record(DeliveryOutcome::AuthFailed);
                    }
                    log_summary(subject, &summary);
                    return Err(err);
                }
            }
        }

        log_summary(subject, &summary);
        Ok(summary)
    }

    /// Deliver to one recipient. The session opened here is dropped before
    /// returning. `Err` means the rest of the batch must not be attempted.
    async fn deliver_one(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        if let Err(e) = validate_email(recipient) {
            tracing::warn!(
                recipient = %recipient,
                outcome = DeliveryOutcome::InvalidAddress.as_str(),
                reason = %e,
                "Skipping invalid recipient"
            );
            return Ok(DeliveryOutcome::InvalidAddress);
        }

        let message = match self.composer.compose(subject, body, recipient) {
            Ok(message) => message,
            Err(e @ ComposeError::InvalidSender { .. }) => {
                tracing::error!(
                    recipient = %recipient,
                    error = %e,
                    "Sender address is not usable, aborting remaining recipients"
                );
                return Err(DeliveryError::InvalidSender(e.to_string()));
            }
            Err(e) => {
                let outcome = match e {
                    ComposeError::Build(_) => DeliveryOutcome::UnexpectedError,
                    _ => DeliveryOutcome::InvalidAddress,
                };
                tracing::warn!(
                    recipient = %recipient,
                    outcome = outcome.as_str(),
                    error = %e,
                    "Failed to compose message"
                );
                return Ok(outcome);
            }
        };

        let result = match self.transport.open_session().await {
            Ok(mut session) => session.transmit(&message).await,
            Err(failure) => Err(failure),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    recipient = %recipient,
                    outcome = DeliveryOutcome::Sent.as_str(),
                    message_id = %message.message_id,
                    "Email sent"
                );
                Ok(DeliveryOutcome::Sent)
            }
            Err(SendFailure::Authentication(text)) => {
                tracing::error!(
                    recipient = %recipient,
                    outcome = DeliveryOutcome::AuthFailed.as_str(),
                    error = %text,
                    "SMTP authentication failed, aborting remaining recipients"
                );
                Err(DeliveryError::Authentication(text))
            }
            Err(failure) => {
                let outcome = DeliveryOutcome::from(&failure);
                tracing::warn!(
                    recipient = %recipient,
                    outcome = outcome.as_str(),
                    error = %failure,
                    "Failed to send email"
                );
                Ok(outcome)
            }
        }
    }
}

fn log_summary(subject: &str, summary: &DeliverySummary) {
    tracing::info!(
        subject = %subject,
        attempted = summary.attempted,
        sent = summary.sent,
        failed = summary.failed,
        skipped = summary.skipped,
        "Delivery finished"
    );
}
