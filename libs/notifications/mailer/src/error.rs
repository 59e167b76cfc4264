//! Error types for the mailer.

use std::fmt;
use thiserror::Error;

/// Result type for mailer operations.
pub type MailResult<T> = Result<T, MailError>;

/// Step of an SMTP session at which a transport failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpStage {
    /// Opening the TCP connection (and the TLS wrapper in implicit mode).
    Connect,
    /// Upgrading a plaintext connection with STARTTLS.
    StartTls,
    /// Logging in with the configured address and password.
    Authenticate,
    /// Transmitting a message.
    Send,
    /// Closing the session with QUIT.
    Quit,
}

impl fmt::Display for SmtpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Connect => "connect",
            Self::StartTls => "STARTTLS",
            Self::Authenticate => "authentication",
            Self::Send => "send",
            Self::Quit => "quit",
        };
        f.write_str(stage)
    }
}

/// Errors that can occur while composing or sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// No recipient carries an email address; nothing was sent.
    #[error("No recipient with an email address")]
    NoRecipients,

    /// An address could not be parsed into a mailbox.
    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// An attachment source could not be read.
    #[error("Failed to read attachment '{filename}': {source}")]
    Attachment {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// The MIME message could not be assembled.
    #[error("Failed to build email message: {0}")]
    Message(String),

    /// Connect, login or transmission failed.
    #[error("SMTP {stage} failed: {message}")]
    Transport { stage: SmtpStage, message: String },
}

impl MailError {
    /// Create a transport error for the given stage.
    pub fn transport(stage: SmtpStage, message: impl fmt::Display) -> Self {
        Self::Transport {
            stage,
            message: message.to_string(),
        }
    }

    /// Stage of the SMTP session that failed, for transport errors.
    pub fn stage(&self) -> Option<SmtpStage> {
        match self {
            Self::Transport { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the failure came from the network or the SMTP server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::Message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = MailError::transport(SmtpStage::Authenticate, "535 bad credentials");
        assert_eq!(
            err.to_string(),
            "SMTP authentication failed: 535 bad credentials"
        );
        assert_eq!(err.stage(), Some(SmtpStage::Authenticate));
        assert!(err.is_transport());
    }

    #[test]
    fn test_no_recipients_is_not_transport() {
        let err = MailError::NoRecipients;
        assert!(!err.is_transport());
        assert_eq!(err.stage(), None);
    }
}
