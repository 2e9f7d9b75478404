//! Mail transport seam.
//!
//! The pipeline talks to the relay through [`MailTransport`], which hands out
//! one [`MailSession`] per message. A session is released when it is
//! dropped, so leaving the recipient's scope by any path closes it.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::compose::OutboundMessage;
use crate::config::SmtpConfig;

/// Why a transmission failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// The relay rejected our credentials.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// The relay refused the recipient mailbox.
    #[error("recipient refused: {0}")]
    RecipientRefused(String),

    /// The relay refused the sender address.
    #[error("sender refused: {0}")]
    SenderRefused(String),

    /// Network, TLS, timeout or transient protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything else.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// A source of mail sessions.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Open a session to the relay.
    async fn open_session(&self) -> Result<Box<dyn MailSession>, SendFailure>;
}

/// A live session to the relay, used for exactly one message.
#[async_trait]
pub trait MailSession: Send {
    /// Authenticate if needed and transmit `message`.
    async fn transmit(&mut self, message: &OutboundMessage) -> Result<(), SendFailure>;
}

/// SMTP relay reached over implicit TLS or STARTTLS.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    host: String,
    port: u16,
    use_ssl: bool,
    username: String,
    password: SecretString,
    timeout: Duration,
}

impl SmtpRelay {
    /// Create a relay from configuration.
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            use_ssl: config.use_ssl,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone(),
            self.password.expose_secret().clone(),
        )
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn open_session(&self) -> Result<Box<dyn MailSession>, SendFailure> {
        let builder = if self.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
        }
        .map_err(|e| classify_error(&e))?;

        let transport = builder
            .port(self.port)
            .credentials(self.credentials())
            .timeout(Some(self.timeout))
            .build();

        tracing::debug!(
            host = %self.host,
            port = self.port,
            ssl = self.use_ssl,
            "SMTP session opened"
        );

        Ok(Box::new(SmtpSession {
            transport,
            host: self.host.clone(),
        }))
    }
}

/// One SMTP connection. The crate is built without lettre's connection pool,
/// so the connection is closed once the message is sent.
struct SmtpSession {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

#[async_trait]
impl MailSession for SmtpSession {
    async fn transmit(&mut self, message: &OutboundMessage) -> Result<(), SendFailure> {
        self.transport
            .send(message.message.clone())
            .await
            .map(|_| ())
            .map_err(|e| classify_error(&e))
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        tracing::debug!(host = %self.host, "SMTP session released");
    }
}

/// Classify a lettre SMTP error.
pub fn classify_error(err: &lettre::transport::smtp::Error) -> SendFailure {
    let text = err.to_string();

    if let Some(code) = err.status() {
        return classify_reply(u16::from(code), &text);
    }

    if err.is_client() {
        SendFailure::Unexpected(text)
    } else {
        SendFailure::Transport(text)
    }
}

/// Classify a negative SMTP reply by its code and text.
///
/// Enhanced status codes (RFC 3463) in the text take precedence over the bare
/// reply code where they are more specific. Permanent security and policy
/// rejections (`5.7.x` other than the credential codes) are not attributed
/// to either address.
///
/// The reply alone does not say which SMTP stage produced it, so a bare
/// `550`/`553` without an enhanced code is taken as a recipient refusal even
/// when it answered `MAIL FROM` or `DATA`.
pub fn classify_reply(code: u16, message: &str) -> SendFailure {
    let text = message.to_string();

    match (code, enhanced_status(message)) {
        (530 | 534 | 535 | 538, _) | (_, Some((5, 7, 8 | 9))) => SendFailure::Authentication(text),
        (_, Some((5, 7, _))) => SendFailure::Unexpected(text),
        (555, _) | (_, Some((_, 1, 7 | 8))) => SendFailure::SenderRefused(text),
        (_, Some((_, 1, _))) | (450 | 452 | 550 | 551 | 552 | 553, _) => {
            SendFailure::RecipientRefused(text)
        }
        (400..=499, _) => SendFailure::Transport(text),
        _ => SendFailure::Unexpected(text),
    }
}

/// Find the first `class.subject.detail` enhanced status code in `message`.
fn enhanced_status(message: &str) -> Option<(u8, u16, u16)> {
    message.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit());
        let mut parts = token.split('.');
        let class = parts.next()?.parse::<u8>().ok()?;
        let subject = parts.next()?.parse::<u16>().ok()?;
        let detail = parts.next()?.parse::<u16>().ok()?;

        if parts.next().is_some() || !matches!(class, 2 | 4 | 5) {
            return None;
        }
        if subject > 999 || detail > 999 {
            return None;
        }

        Some((class, subject, detail))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhanced_status() {
        assert_eq!(
            enhanced_status("permanent error (535): 5.7.8 Username and Password not accepted"),
            Some((5, 7, 8))
        );
        assert_eq!(enhanced_status("550 5.1.1 <x@y.z>: user unknown"), Some((5, 1, 1)));
        assert_eq!(enhanced_status("(4.2.2)"), Some((4, 2, 2)));
        assert_eq!(enhanced_status("mailbox unavailable"), None);
        assert_eq!(enhanced_status("version 1.2.3 of something"), None);
        assert_eq!(enhanced_status("1.2.3.4"), None);
    }

    #[test]
    fn test_classify_authentication() {
        assert!(matches!(
            classify_reply(535, "5.7.8 Username and Password not accepted"),
            SendFailure::Authentication(_)
        ));
        assert!(matches!(
            classify_reply(530, "Authentication required"),
            SendFailure::Authentication(_)
        ));
        assert!(matches!(
            classify_reply(550, "5.7.9 Application-specific password required"),
            SendFailure::Authentication(_)
        ));
    }

    #[test]
    fn test_classify_sender_refused() {
        assert!(matches!(
            classify_reply(553, "5.1.7 The sender address is invalid"),
            SendFailure::SenderRefused(_)
        ));
        assert!(matches!(
            classify_reply(555, "MAIL FROM parameters not recognized"),
            SendFailure::SenderRefused(_)
        ));
    }

    #[test]
    fn test_classify_recipient_refused() {
        assert!(matches!(
            classify_reply(550, "5.1.1 The email account that you tried to reach does not exist"),
            SendFailure::RecipientRefused(_)
        ));
        assert!(matches!(
            classify_reply(550, "Mailbox unavailable"),
            SendFailure::RecipientRefused(_)
        ));
        assert!(matches!(
            classify_reply(452, "4.2.2 Mailbox full"),
            SendFailure::RecipientRefused(_)
        ));
    }

    #[test]
    fn test_classify_transient_and_other() {
        assert!(matches!(
            classify_reply(421, "4.7.0 Try again later, closing connection"),
            SendFailure::Transport(_)
        ));
        assert!(matches!(
            classify_reply(554, "5.6.0 Message content rejected"),
            SendFailure::Unexpected(_)
        ));
    }

    #[test]
    fn test_classify_policy_rejection() {
        assert!(matches!(
            classify_reply(550, "5.7.1 Message rejected due to content policy"),
            SendFailure::Unexpected(_)
        ));
        assert!(matches!(
            classify_reply(550, "5.7.26 Unauthenticated email is not accepted"),
            SendFailure::Unexpected(_)
        ));
        // Credential codes still win.
        assert!(matches!(
            classify_reply(535, "5.7.8 Username and Password not accepted"),
            SendFailure::Authentication(_)
        ));
    }

    #[test]
    fn test_relay_from_config() {
        let mut config = SmtpConfig::default();
        config.username = "bot@example.com".to_string();
        config.password = SecretString::new("hunter2".to_string());
        config.timeout_secs = 5;

        let relay = SmtpRelay::new(&config);
        assert_eq!(relay.host, "smtp.gmail.com");
        assert_eq!(relay.port, 465);
        assert!(relay.use_ssl);
        assert_eq!(relay.timeout, Duration::from_secs(5));
        assert!(!format!("{:?}", relay).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_open_session_builds_transport() {
        let relay = SmtpRelay::new(&SmtpConfig::default());
        // Building the transport does not connect.
        assert!(relay.open_session().await.is_ok());

        let mut config = SmtpConfig::default();
        config.use_ssl = false;
        config.port = 587;
        assert!(SmtpRelay::new(&config).open_session().await.is_ok());
    }
}
