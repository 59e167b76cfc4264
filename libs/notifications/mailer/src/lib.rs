//! SMTP mailer
//!
//! Composes HTML messages (optionally with file attachments) and sends them
//! to one or more recipients over a single authenticated SMTP session per
//! call, with implicit TLS or STARTTLS.
//!
//! ## Components
//!
//! - **Models**: `Recipient`, `Communication`, `Attachment`
//! - **Message**: `MessageComposer` builds the MIME messages
//! - **Transport**: `SmtpConnector`/`SmtpSession` seam, with `LettreConnector`
//!   for real servers and `InMemoryConnector` for tests
//! - **Service**: `MailService` ties it together
//!
//! ## Usage
//!
//! ```ignore
//! use core_config::{FromEnv, SmtpSettings};
//! use mailer::{Communication, MailService, Recipient};
//!
//! let mut service = MailService::new(SmtpSettings::from_env()?)?;
//! service.set_initial_tls(false);
//!
//! let communication = Communication::new("Admin", "Test", "<p>This is a test mail.</p>")
//!     .with_receiver(Recipient::from_email("receiver@mail.com"));
//! let report = service.send(&communication).await?;
//! ```

pub mod error;
pub mod message;
pub mod models;
pub mod service;
pub mod transport;

pub use error::{MailError, MailResult, SmtpStage};
pub use message::{LoadedAttachment, MessageComposer, OutgoingMessage};
pub use models::{Attachment, Communication, Recipient};
pub use service::{Delivery, DeliveryReport, MailService};
pub use transport::{
    InMemoryConnector, LettreConnector, RecordedMessage, SmtpConnector, SmtpSession, TlsMode,
};
