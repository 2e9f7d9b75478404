//! Email composition and delivery.

pub mod compose;
pub mod pipeline;
pub mod transport;

pub use compose::{ComposeError, MessageComposer, OutboundMessage, Sender};
pub use pipeline::{DeliveryError, DeliveryOutcome, DeliveryPipeline, DeliverySummary};
pub use transport::{classify_reply, MailSession, MailTransport, SendFailure, SmtpRelay};
