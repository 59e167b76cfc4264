//! SMTP connector using lettre's low-level async connection.
//!
//! lettre's `AsyncSmtpTransport` opens a connection per message unless
//! pooling is enabled, so the session is driven by hand to keep a whole
//! batch on one connection.

use super::{SmtpConnector, SmtpSession, TlsMode};
use crate::error::{MailError, MailResult, SmtpStage};
use crate::message::OutgoingMessage;
use async_trait::async_trait;
use core_config::SmtpSettings;
use lettre::transport::smtp::{
    authentication::{Credentials, Mechanism},
    client::{AsyncSmtpConnection, TlsParameters},
    extension::ClientId,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Same default lettre applies to its own transports.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const AUTH_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Connects to a real SMTP server.
#[derive(Debug, Clone)]
pub struct LettreConnector {
    timeout: Option<Duration>,
    hello_name: ClientId,
}

impl LettreConnector {
    pub fn new() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            hello_name: ClientId::default(),
        }
    }

    /// Override the network timeout (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn tls_parameters(settings: &SmtpSettings, stage: SmtpStage) -> MailResult<TlsParameters> {
        TlsParameters::builder(settings.host.clone())
            .build()
            .map_err(|e| MailError::transport(stage, format!("invalid TLS parameters: {}", e)))
    }

    async fn open(
        &self,
        settings: &SmtpSettings,
        tls_parameters: Option<TlsParameters>,
    ) -> MailResult<AsyncSmtpConnection> {
        AsyncSmtpConnection::connect_tokio1(
            (settings.host.as_str(), settings.port),
            self.timeout,
            &self.hello_name,
            tls_parameters,
            None,
        )
        .await
        .map_err(|e| MailError::transport(SmtpStage::Connect, e))
    }
}

impl Default for LettreConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmtpConnector for LettreConnector {
    async fn connect(
        &self,
        settings: &SmtpSettings,
        mode: TlsMode,
    ) -> MailResult<Box<dyn SmtpSession>> {
        debug!(
            host = %settings.host,
            port = settings.port,
            mode = ?mode,
            "Opening SMTP connection"
        );

        let mut connection = match mode {
            TlsMode::Implicit => {
                let tls = Self::tls_parameters(settings, SmtpStage::Connect)?;
                self.open(settings, Some(tls)).await?
            }
            TlsMode::StartTls => {
                let mut connection = self.open(settings, None).await?;
                let upgraded = match Self::tls_parameters(settings, SmtpStage::StartTls) {
                    Ok(tls) => connection
                        .starttls(tls, &self.hello_name)
                        .await
                        .map_err(|e| MailError::transport(SmtpStage::StartTls, e)),
                    Err(e) => Err(e),
                };
                if let Err(e) = upgraded {
                    let _ = connection.quit().await;
                    return Err(e);
                }
                connection
            }
        };

        let credentials = Credentials::new(settings.address.clone(), settings.password.clone());
        if let Err(e) = connection.auth(AUTH_MECHANISMS, &credentials).await {
            let _ = connection.quit().await;
            return Err(MailError::transport(SmtpStage::Authenticate, e));
        }

        debug!(host = %settings.host, address = %settings.address, "SMTP session authenticated");

        Ok(Box::new(LettreSession { connection }))
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }
}

struct LettreSession {
    connection: AsyncSmtpConnection,
}

#[async_trait]
impl SmtpSession for LettreSession {
    async fn send(&mut self, message: &OutgoingMessage) -> MailResult<()> {
        let response = self
            .connection
            .send(message.message.envelope(), &message.formatted())
            .await
            .map_err(|e| MailError::transport(SmtpStage::Send, e))?;

        debug!(
            to = %message.recipient,
            message_id = %message.message_id,
            response = ?response.message().next(),
            "Message accepted"
        );

        Ok(())
    }

    async fn quit(&mut self) -> MailResult<()> {
        self.connection
            .quit()
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "SMTP QUIT failed");
                MailError::transport(SmtpStage::Quit, e)
            })
    }
}
