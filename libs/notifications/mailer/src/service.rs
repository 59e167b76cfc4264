//! Mail service: turns communications into SMTP batches.
//!
//! Each send call composes one message per recipient, opens a single
//! authenticated session, transmits the messages in order and quits.
//! A batch is all-or-nothing for the caller: if any step fails the call
//! returns the error and nothing is reported as delivered, even when the
//! server accepted earlier messages of the same session.

use crate::error::{MailError, MailResult};
use crate::message::{load_attachments, LoadedAttachment, MessageComposer, OutgoingMessage};
use crate::models::{Attachment, Communication, Recipient};
use crate::transport::{LettreConnector, SmtpConnector, TlsMode};
use core_config::SmtpSettings;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// A message accepted as part of a successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub message_id: String,
}

/// Outcome of a successful send call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub deliveries: Vec<Delivery>,
}

impl DeliveryReport {
    /// Number of messages sent.
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Message-IDs in send order.
    pub fn message_ids(&self) -> Vec<&str> {
        self.deliveries
            .iter()
            .map(|delivery| delivery.message_id.as_str())
            .collect()
    }
}

impl From<&[OutgoingMessage]> for DeliveryReport {
    fn from(messages: &[OutgoingMessage]) -> Self {
        Self {
            deliveries: messages
                .iter()
                .map(|message| Delivery {
                    recipient: message.recipient.clone(),
                    message_id: message.message_id.clone(),
                })
                .collect(),
        }
    }
}

/// Sends communications through one SMTP account.
pub struct MailService {
    settings: SmtpSettings,
    connector: Arc<dyn SmtpConnector>,
    composer: MessageComposer,
    tls_mode: TlsMode,
}

impl MailService {
    /// Create a service that talks to the configured SMTP server.
    ///
    /// Starts in implicit TLS mode. Fails if the configured address is not
    /// a valid mailbox.
    pub fn new(settings: SmtpSettings) -> MailResult<Self> {
        Self::with_connector(settings, Arc::new(LettreConnector::new()))
    }

    /// Create a service with a custom connector.
    pub fn with_connector(
        settings: SmtpSettings,
        connector: Arc<dyn SmtpConnector>,
    ) -> MailResult<Self> {
        let composer = MessageComposer::new(&settings.address)?;

        Ok(Self {
            settings,
            connector,
            composer,
            tls_mode: TlsMode::default(),
        })
    }

    /// Choose implicit TLS (`true`) or STARTTLS (`false`) for later sends.
    pub fn set_initial_tls(&mut self, use_tls: bool) {
        self.tls_mode = TlsMode::from_initial_tls(use_tls);
        debug!(mode = ?self.tls_mode, "SMTP TLS mode changed");
    }

    pub fn tls_mode(&self) -> TlsMode {
        self.tls_mode
    }

    /// Send the communication's description as HTML to every recipient
    /// that has an email address.
    pub async fn send(&self, communication: &Communication) -> MailResult<DeliveryReport> {
        debug!(sender = %communication.sender, title = %communication.title, "Sending communication");
        self.send_multiple(
            &communication.receivers,
            &communication.title,
            &communication.description,
        )
        .await
    }

    /// Like [`send`](Self::send), with every attachment added to every message.
    pub async fn send_with_media(
        &self,
        communication: &Communication,
        attachments: Vec<Attachment>,
    ) -> MailResult<DeliveryReport> {
        debug!(
            sender = %communication.sender,
            title = %communication.title,
            attachments = attachments.len(),
            "Sending communication with attachments"
        );
        self.send_multiple_with_attachments(
            &communication.receivers,
            &communication.title,
            &communication.description,
            attachments,
        )
        .await
    }

    /// Send one HTML message per recipient with an email address.
    pub async fn send_multiple(
        &self,
        receivers: &[Recipient],
        subject: &str,
        body: &str,
    ) -> MailResult<DeliveryReport> {
        self.send_multiple_with_attachments(receivers, subject, body, Vec::new())
            .await
    }

    /// Send one HTML message per recipient, each carrying every attachment.
    pub async fn send_multiple_with_attachments(
        &self,
        receivers: &[Recipient],
        subject: &str,
        body: &str,
        attachments: Vec<Attachment>,
    ) -> MailResult<DeliveryReport> {
        let addresses: Vec<&str> = receivers.iter().filter_map(Recipient::address).collect();
        self.deliver(&addresses, subject, body, attachments).await
    }

    /// Send one HTML message to a single address.
    pub async fn send_single(
        &self,
        receiver_address: &str,
        subject: &str,
        body: &str,
    ) -> MailResult<DeliveryReport> {
        self.send_single_with_attachments(receiver_address, subject, body, Vec::new())
            .await
    }

    /// Send one HTML message with attachments to a single address.
    pub async fn send_single_with_attachments(
        &self,
        receiver_address: &str,
        subject: &str,
        body: &str,
        attachments: Vec<Attachment>,
    ) -> MailResult<DeliveryReport> {
        let address = receiver_address.trim();
        let addresses: Vec<&str> = if address.is_empty() {
            Vec::new()
        } else {
            vec![address]
        };
        self.deliver(&addresses, subject, body, attachments).await
    }

    async fn deliver(
        &self,
        addresses: &[&str],
        subject: &str,
        body: &str,
        attachments: Vec<Attachment>,
    ) -> MailResult<DeliveryReport> {
        if addresses.is_empty() {
            warn!(subject = %subject, "No recipient with an email address, nothing sent");
            return Err(MailError::NoRecipients);
        }

        let attachments = load_attachments(attachments)?;
        let messages = self.compose_batch(addresses, subject, body, &attachments)?;

        self.transmit(&messages).await
    }

    fn compose_batch(
        &self,
        addresses: &[&str],
        subject: &str,
        body: &str,
        attachments: &[LoadedAttachment],
    ) -> MailResult<Vec<OutgoingMessage>> {
        addresses
            .iter()
            .map(|address| self.composer.compose(address, subject, body, attachments))
            .collect()
    }

    #[instrument(
        skip_all,
        fields(
            connector = self.connector.name(),
            host = %self.settings.host,
            port = self.settings.port,
            mode = ?self.tls_mode,
            messages = messages.len(),
        )
    )]
    async fn transmit(&self, messages: &[OutgoingMessage]) -> MailResult<DeliveryReport> {
        let mut session = self
            .connector
            .connect(&self.settings, self.tls_mode)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to open SMTP session");
                e
            })?;

        for message in messages {
            if let Err(e) = session.send(message).await {
                error!(
                    to = %message.recipient,
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to send message, aborting batch"
                );
                let _ = session.quit().await;
                return Err(e);
            }
        }

        // Every message was accepted; a failing QUIT does not undo that.
        if let Err(e) = session.quit().await {
            warn!(error = %e, "SMTP session did not close cleanly");
        }

        info!(count = messages.len(), "Emails sent successfully via SMTP");

        Ok(DeliveryReport::from(messages))
    }
}
