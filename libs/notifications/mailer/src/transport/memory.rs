//! In-memory connector for testing

use super::{SmtpConnector, SmtpSession, TlsMode};
use crate::error::{MailError, MailResult, SmtpStage};
use crate::message::OutgoingMessage;
use async_trait::async_trait;
use core_config::SmtpSettings;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A message captured by [`InMemoryConnector`].
#[derive(Debug, Clone)]
pub struct RecordedMessage {
    /// Index of the session (connection) the message went through.
    pub session: usize,
    /// TLS mode of that session.
    pub mode: TlsMode,
    pub recipient: String,
    pub envelope_to: Vec<String>,
    pub message_id: String,
    /// The serialized message as it would go over DATA.
    pub raw: String,
}

#[derive(Debug, Default)]
struct Journal {
    attempts: Vec<TlsMode>,
    messages: Vec<RecordedMessage>,
    quits: usize,
}

/// Connector that records sessions and messages instead of talking SMTP.
///
/// Failures can be injected at any stage of the session, or on the n-th
/// message (0-based) sent within one session.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    journal: Arc<Mutex<Journal>>,
    fail_at: Option<SmtpStage>,
    fail_on_message: Option<usize>,
}

impl InMemoryConnector {
    /// Create a connector that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector that fails at the given stage.
    pub fn failing_at(stage: SmtpStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    /// Create a connector whose sessions reject the message at `index`.
    pub fn failing_on_message(index: usize) -> Self {
        Self {
            fail_on_message: Some(index),
            ..Self::default()
        }
    }

    /// TLS mode of every connection attempt, in order.
    pub async fn connection_attempts(&self) -> Vec<TlsMode> {
        self.journal.lock().await.attempts.clone()
    }

    /// Number of connection attempts.
    pub async fn connection_count(&self) -> usize {
        self.journal.lock().await.attempts.len()
    }

    /// All messages accepted so far.
    pub async fn sent_messages(&self) -> Vec<RecordedMessage> {
        self.journal.lock().await.messages.clone()
    }

    /// Number of messages accepted so far.
    pub async fn sent_count(&self) -> usize {
        self.journal.lock().await.messages.len()
    }

    /// Number of sessions closed with a successful QUIT.
    pub async fn quit_count(&self) -> usize {
        self.journal.lock().await.quits
    }

    /// Check if a message was accepted for a specific address
    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.journal
            .lock()
            .await
            .messages
            .iter()
            .any(|message| message.recipient == address)
    }

    /// Forget everything recorded so far.
    pub async fn clear(&self) {
        let mut journal = self.journal.lock().await;
        journal.attempts.clear();
        journal.messages.clear();
        journal.quits = 0;
    }

    fn injected(&self, stage: SmtpStage) -> MailResult<()> {
        match self.fail_at {
            Some(failing) if failing == stage => Err(MailError::transport(
                stage,
                format!("simulated {} failure", stage),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SmtpConnector for InMemoryConnector {
    async fn connect(
        &self,
        _settings: &SmtpSettings,
        mode: TlsMode,
    ) -> MailResult<Box<dyn SmtpSession>> {
        let session = {
            let mut journal = self.journal.lock().await;
            journal.attempts.push(mode);
            journal.attempts.len() - 1
        };

        self.injected(SmtpStage::Connect)?;
        if mode == TlsMode::StartTls {
            self.injected(SmtpStage::StartTls)?;
        }
        self.injected(SmtpStage::Authenticate)?;

        Ok(Box::new(InMemorySession {
            connector: self.clone(),
            session,
            mode,
            sent: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

struct InMemorySession {
    connector: InMemoryConnector,
    session: usize,
    mode: TlsMode,
    sent: usize,
}

#[async_trait]
impl SmtpSession for InMemorySession {
    async fn send(&mut self, message: &OutgoingMessage) -> MailResult<()> {
        let index = self.sent;
        self.sent += 1;

        self.connector.injected(SmtpStage::Send)?;
        if self.connector.fail_on_message == Some(index) {
            return Err(MailError::transport(
                SmtpStage::Send,
                format!("simulated rejection of message {}", index),
            ));
        }

        let recorded = RecordedMessage {
            session: self.session,
            mode: self.mode,
            recipient: message.recipient.clone(),
            envelope_to: message
                .message
                .envelope()
                .to()
                .iter()
                .map(ToString::to_string)
                .collect(),
            message_id: message.message_id.clone(),
            raw: String::from_utf8_lossy(&message.formatted()).into_owned(),
        };
        self.connector.journal.lock().await.messages.push(recorded);

        Ok(())
    }

    async fn quit(&mut self) -> MailResult<()> {
        self.connector.injected(SmtpStage::Quit)?;
        self.connector.journal.lock().await.quits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageComposer;

    fn settings() -> SmtpSettings {
        SmtpSettings::new("smtp.example.com", 465, "admin@example.com", "pw")
    }

    fn message(to: &str) -> OutgoingMessage {
        MessageComposer::new("admin@example.com")
            .unwrap()
            .compose(to, "Subject", "<p>Body</p>", &[])
            .unwrap()
    }

    #[tokio::test]
    async fn test_records_sessions_and_messages() {
        let connector = InMemoryConnector::new();

        let mut session = connector
            .connect(&settings(), TlsMode::StartTls)
            .await
            .unwrap();
        session.send(&message("ada@example.com")).await.unwrap();
        session.quit().await.unwrap();

        assert_eq!(connector.connection_attempts().await, vec![TlsMode::StartTls]);
        assert_eq!(connector.quit_count().await, 1);
        assert!(connector.was_sent_to("ada@example.com").await);
        assert!(!connector.was_sent_to("bob@example.com").await);

        let sent = connector.sent_messages().await;
        assert_eq!(sent[0].envelope_to, vec!["ada@example.com".to_string()]);

        connector.clear().await;
        assert_eq!(connector.sent_count().await, 0);
        assert_eq!(connector.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_starttls_failure_only_applies_to_starttls_mode() {
        let connector = InMemoryConnector::failing_at(SmtpStage::StartTls);

        assert!(connector.connect(&settings(), TlsMode::Implicit).await.is_ok());

        let err = match connector.connect(&settings(), TlsMode::StartTls).await {
            Ok(_) => panic!("STARTTLS should fail"),
            Err(e) => e,
        };
        assert_eq!(err.stage(), Some(SmtpStage::StartTls));
    }

    #[tokio::test]
    async fn test_fails_on_selected_message() {
        let connector = InMemoryConnector::failing_on_message(1);
        let mut session = connector
            .connect(&settings(), TlsMode::Implicit)
            .await
            .unwrap();

        assert!(session.send(&message("a@example.com")).await.is_ok());
        let err = session.send(&message("b@example.com")).await.unwrap_err();
        assert_eq!(err.stage(), Some(SmtpStage::Send));
        assert_eq!(connector.sent_count().await, 1);
    }
}
