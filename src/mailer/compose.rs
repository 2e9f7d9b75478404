//! Message composition.
//!
//! Every message is `multipart/alternative` with the body verbatim as the
//! plain-text part and the body wrapped in a branded HTML layout as the HTML
//! part. A few extra headers are set that spam filters look for on
//! automated mail.

use std::error::Error as StdError;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::{Address, Message};
use thiserror::Error;
use uuid::Uuid;

/// Domain used in Message-IDs when the sender address has none.
const FALLBACK_ID_DOMAIN: &str = "nudge.local";

/// Errors raised while building a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// The configured sender address could not be parsed.
    #[error("invalid sender address '{address}': {reason}")]
    InvalidSender {
        /// The sender address.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// A recipient address could not be parsed into a mailbox.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The message builder rejected the message.
    #[error("failed to build message: {0}")]
    Build(String),
}

macro_rules! text_header {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $ty(pub String);

        impl Header for $ty {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name)
            }

            fn parse(s: &str) -> Result<Self, Box<dyn StdError + Send + Sync>> {
                Ok(Self(s.to_string()))
            }

            fn display(&self) -> HeaderValue {
                HeaderValue::new(Self::name(), self.0.clone())
            }
        }
    };
}

text_header!(
    /// `X-Mailer`: identifies the sending software.
    XMailer,
    "X-Mailer"
);
text_header!(
    /// `X-Priority`: numeric priority, 3 is normal.
    XPriority,
    "X-Priority"
);
text_header!(
    /// `X-MSMail-Priority`: Outlook priority marker.
    XMsMailPriority,
    "X-MSMail-Priority"
);
text_header!(
    /// `Importance`: RFC 2156 importance marker.
    Importance,
    "Importance"
);

/// Who messages are sent as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Display name.
    pub name: String,
    /// Email address.
    pub address: String,
}

impl Sender {
    /// Create a sender identity.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The sender as a mailbox with display name.
    pub fn mailbox(&self) -> Result<Mailbox, ComposeError> {
        Ok(Mailbox::new(Some(self.name.clone()), self.parsed_address()?))
    }

    fn parsed_address(&self) -> Result<Address, ComposeError> {
        self.address
            .parse::<Address>()
            .map_err(|e| ComposeError::InvalidSender {
                address: self.address.clone(),
                reason: e.to_string(),
            })
    }

    /// Domain part of the sender address, used in Message-IDs.
    fn id_domain(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
            .unwrap_or(FALLBACK_ID_DOMAIN)
    }
}

fn parse_address(address: &str) -> Result<Address, ComposeError> {
    address
        .parse::<Address>()
        .map_err(|e| ComposeError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// A message ready for transmission to a single recipient.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text part, identical to the input body.
    pub plain_body: String,
    /// HTML part.
    pub html_body: String,
    /// Recipient address.
    pub to: String,
    /// Sender identity.
    pub sender: Sender,
    /// Message-ID header value, including angle brackets.
    pub message_id: String,
    /// Composition time, also used for the Date header.
    pub date: DateTime<Local>,
    /// The assembled message.
    pub message: Message,
}

impl OutboundMessage {
    /// RFC 5322 serialization of the message.
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

/// Builds outbound messages for a fixed sender.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    sender: Sender,
    mailer: String,
}

impl MessageComposer {
    /// Create a composer sending as `sender`, identifying itself as
    /// `mailer_name` in the `X-Mailer` header.
    pub fn new(sender: Sender, mailer_name: &str) -> Self {
        Self {
            sender,
            mailer: format!("{}/{}", mailer_name, env!("CARGO_PKG_VERSION")),
        }
    }

    /// The sender identity.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Compose a message to `to` at the current time.
    pub fn compose(
        &self,
        subject: &str,
        body: &str,
        to: &str,
    ) -> Result<OutboundMessage, ComposeError> {
        self.compose_at(subject, body, to, Local::now())
    }

    /// Compose a message to `to` as of `now`.
    pub fn compose_at(
        &self,
        subject: &str,
        body: &str,
        to: &str,
        now: DateTime<Local>,
    ) -> Result<OutboundMessage, ComposeError> {
        let from = self.sender.mailbox()?;
        let reply_to = Mailbox::new(None, self.sender.parsed_address()?);
        let recipient = Mailbox::new(None, parse_address(to)?);

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.sender.id_domain());
        let html_body = render_html(&self.sender.name, body, now);

        let message = Message::builder()
            .from(from)
            .reply_to(reply_to)
            .to(recipient)
            .subject(subject)
            .date(SystemTime::from(now))
            .message_id(Some(message_id.clone()))
            .header(XMailer(self.mailer.clone()))
            .header(XPriority("3".to_string()))
            .header(XMsMailPriority("Normal".to_string()))
            .header(Importance("Normal".to_string()))
            .multipart(MultiPart::alternative_plain_html(
                body.to_string(),
                html_body.clone(),
            ))
            .map_err(|e| ComposeError::Build(e.to_string()))?;

        Ok(OutboundMessage {
            subject: subject.to_string(),
            plain_body: body.to_string(),
            html_body,
            to: to.to_string(),
            sender: self.sender.clone(),
            message_id,
            date: now,
            message,
        })
    }
}

/// Wrap the body in the branded HTML layout.
fn render_html(brand: &str, body: &str, now: DateTime<Local>) -> String {
    let sent_at = now.format("%d/%m/%Y at %H:%M");

    format!(
        r#"<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin-bottom: 20px;">
            <h2 style="color: #007bff; margin-top: 0;">{brand}</h2>
            <p style="margin: 0; font-size: 16px;">{body}</p>
        </div>
        <div style="text-align: center; color: #6c757d; font-size: 12px;">
            <p>This email was sent automatically by {brand}</p>
            <p>Sent on {sent_at}</p>
            <p>To unsubscribe, contact the administrator</p>
        </div>
    </div>
</body>
</html>
"#
    )
}
