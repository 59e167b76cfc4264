//! MIME message assembly.
//!
//! Every outgoing message is `multipart/mixed`: one HTML part followed by
//! one `application/octet-stream` part per attachment.

use crate::error::{MailError, MailResult};
use crate::models::Attachment;
use lettre::message::{
    header::ContentType, Attachment as AttachmentPart, Mailbox, MultiPart, SinglePart,
};
use lettre::Message;
use uuid::Uuid;

/// Attachment content after its source has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Read every attachment source exactly once.
pub fn load_attachments(attachments: Vec<Attachment>) -> MailResult<Vec<LoadedAttachment>> {
    attachments
        .into_iter()
        .map(|attachment| {
            let filename = attachment.filename().to_string();
            attachment
                .into_content()
                .map(|(filename, content)| LoadedAttachment { filename, content })
                .map_err(|source| MailError::Attachment { filename, source })
        })
        .collect()
}

/// A composed message ready for transmission.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Recipient address, also the envelope recipient.
    pub recipient: String,
    /// Value of the `Message-ID` header, angle brackets included.
    pub message_id: String,
    pub message: Message,
}

impl OutgoingMessage {
    /// The message serialized for the DATA command.
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

/// Builds messages sent from one configured address.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    from: Mailbox,
    id_domain: String,
}

impl MessageComposer {
    /// Create a composer for the given `From` address.
    pub fn new(from_address: &str) -> MailResult<Self> {
        let from = parse_mailbox(from_address)?;
        let id_domain = from.email.domain().to_string();

        Ok(Self { from, id_domain })
    }

    /// Compose one HTML message to `to`, carrying every attachment.
    pub fn compose(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: &[LoadedAttachment],
    ) -> MailResult<OutgoingMessage> {
        let recipient = parse_mailbox(to)?;
        let message_id = self.next_message_id();

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(html_body.to_string()));
        for attachment in attachments {
            body = body.singlepart(attachment_part(attachment)?);
        }

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .date_now()
            .message_id(Some(message_id.clone()))
            .multipart(body)?;

        Ok(OutgoingMessage {
            recipient: to.trim().to_string(),
            message_id,
            message,
        })
    }

    fn next_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.id_domain)
    }
}

const OCTET_STREAM: &str = "application/octet-stream";

fn attachment_part(attachment: &LoadedAttachment) -> MailResult<SinglePart> {
    Ok(AttachmentPart::new(attachment.filename.clone())
        .body(attachment.content.clone(), attachment_content_type(&attachment.filename)?))
}

/// `application/octet-stream` carrying the file name as its `name` parameter.
///
/// Names the parameter syntax cannot hold (non-ASCII, control characters)
/// get the bare type; the disposition still carries the file name.
fn attachment_content_type(filename: &str) -> MailResult<ContentType> {
    let name: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();

    ContentType::parse(&format!("{}; name=\"{}\"", OCTET_STREAM, name))
        .or_else(|_| ContentType::parse(OCTET_STREAM))
        .map_err(|e| MailError::Message(format!("Invalid attachment content type: {}", e)))
}

fn parse_mailbox(address: &str) -> MailResult<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
