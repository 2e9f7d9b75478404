//! Test helpers for integration tests.
//!
//! Provides a recording mail transport and helpers to build a configured
//! router without touching a real SMTP relay.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;

use nudge::config::Config;
use nudge::web::create_router;
use nudge::{AppState, MailSession, MailTransport, OutboundMessage, SendFailure};

/// A message the recording transport accepted.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    pub message_id: String,
}

#[derive(Default)]
struct Shared {
    opened: AtomicUsize,
    released: AtomicUsize,
    sent: Mutex<Vec<SentMail>>,
    failures: Mutex<HashMap<String, SendFailure>>,
}

/// Mail transport that records messages instead of sending them.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    shared: Arc<Shared>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transmission to `recipient` fail with `failure`.
    pub fn fail_for(&self, recipient: &str, failure: SendFailure) {
        self.shared
            .failures
            .lock()
            .unwrap()
            .insert(recipient.to_string(), failure);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.to).collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }
}

struct RecordingSession {
    shared: Arc<Shared>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn open_session(&self) -> Result<Box<dyn MailSession>, SendFailure> {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            shared: self.shared.clone(),
        }))
    }
}

#[async_trait]
impl MailSession for RecordingSession {
    async fn transmit(&mut self, message: &OutboundMessage) -> Result<(), SendFailure> {
        let failure = self.shared.failures.lock().unwrap().get(&message.to).cloned();
        if let Some(failure) = failure {
            return Err(failure);
        }

        self.shared.sent.lock().unwrap().push(SentMail {
            to: message.to.clone(),
            subject: message.subject.clone(),
            plain_body: message.plain_body.clone(),
            html_body: message.html_body.clone(),
            message_id: message.message_id.clone(),
        });
        Ok(())
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A fully configured test setup.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.smtp.username = "bot@example.com".to_string();
    config.smtp.password = secrecy::SecretString::new("app-password".to_string());
    config.mail.recipients = vec!["alice@example.com".to_string(), "bob@example.org".to_string()];
    config.logging.file = None;
    config
}

/// Create a test server over `config` with a recording transport.
pub fn create_test_server(config: &Config, transport: &RecordingTransport) -> TestServer {
    let state = Arc::new(AppState::new(config, Arc::new(transport.clone())));
    let router = create_router(state, &config.server);
    TestServer::new(router).expect("Failed to create test server")
}
