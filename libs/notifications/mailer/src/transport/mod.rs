//! SMTP session seam.
//!
//! A connector opens one authenticated session; the service pushes every
//! message of a batch through it and then quits.

pub mod memory;
pub mod smtp;

pub use memory::{InMemoryConnector, RecordedMessage};
pub use smtp::LettreConnector;

use crate::error::MailResult;
use crate::message::OutgoingMessage;
use async_trait::async_trait;
use core_config::SmtpSettings;

/// How the connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// TLS handshake right after the TCP connect (usually port 465).
    #[default]
    Implicit,
    /// Plaintext connect, then upgrade with STARTTLS (usually port 587).
    StartTls,
}

impl TlsMode {
    /// Map the "initial TLS" flag onto a mode.
    pub fn from_initial_tls(initial_tls: bool) -> Self {
        if initial_tls {
            Self::Implicit
        } else {
            Self::StartTls
        }
    }
}

/// An open, authenticated SMTP session.
#[async_trait]
pub trait SmtpSession: Send {
    /// Transmit one message.
    async fn send(&mut self, message: &OutgoingMessage) -> MailResult<()>;

    /// End the session with QUIT.
    async fn quit(&mut self) -> MailResult<()>;
}

/// Opens sessions against an SMTP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    /// Connect, secure the channel according to `mode` and log in.
    async fn connect(
        &self,
        settings: &SmtpSettings,
        mode: TlsMode,
    ) -> MailResult<Box<dyn SmtpSession>>;

    /// Connector name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_mode_from_initial_tls() {
        assert_eq!(TlsMode::from_initial_tls(true), TlsMode::Implicit);
        assert_eq!(TlsMode::from_initial_tls(false), TlsMode::StartTls);
        assert_eq!(TlsMode::default(), TlsMode::Implicit);
    }
}
