use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// A mail recipient.
///
/// `complete_name` only exists when both `name` and `last_name` are
/// present: an explicit non-empty value is kept, otherwise it is derived as
/// `"{name} {last_name}"`. Recipients without an email address are skipped
/// when sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecipientFields")]
pub struct Recipient {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub complete_name: Option<String>,
    pub email: Option<String>,
}

/// Raw recipient as it arrives over serde, before the name is derived.
#[derive(Deserialize)]
struct RecipientFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    complete_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<RecipientFields> for Recipient {
    fn from(fields: RecipientFields) -> Self {
        Self::build(fields.name, fields.last_name, fields.complete_name, fields.email)
    }
}

impl Recipient {
    /// Create a recipient, deriving `complete_name` from the name parts.
    pub fn new(
        name: Option<impl Into<String>>,
        last_name: Option<impl Into<String>>,
        email: Option<impl Into<String>>,
    ) -> Self {
        Self::build(
            name.map(Into::into),
            last_name.map(Into::into),
            None,
            email.map(Into::into),
        )
    }

    /// Recipient known only by address.
    pub fn from_email(email: impl Into<String>) -> Self {
        Self::build(None, None, None, Some(email.into()))
    }

    /// Set an explicit complete name, replacing any derived one.
    ///
    /// Ignored unless both name parts are present.
    pub fn with_complete_name(mut self, complete_name: impl Into<String>) -> Self {
        self.complete_name = resolve_complete_name(
            self.name.as_deref(),
            self.last_name.as_deref(),
            Some(complete_name.into()),
        );
        self
    }

    fn build(
        name: Option<String>,
        last_name: Option<String>,
        complete_name: Option<String>,
        email: Option<String>,
    ) -> Self {
        let complete_name =
            resolve_complete_name(name.as_deref(), last_name.as_deref(), complete_name);

        Self {
            name,
            last_name,
            complete_name,
            email,
        }
    }

    /// The address to send to, if the recipient has a non-blank one.
    pub fn address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

fn resolve_complete_name(
    name: Option<&str>,
    last_name: Option<&str>,
    explicit: Option<String>,
) -> Option<String> {
    match (name, last_name) {
        (Some(name), Some(last_name)) if !name.is_empty() && !last_name.is_empty() => explicit
            .filter(|value| !value.is_empty())
            .or_else(|| Some(format!("{} {}", name, last_name))),
        _ => None,
    }
}

/// A message to send to a list of recipients.
///
/// `title` becomes the subject and `description` the HTML body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    pub sender: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub receivers: Vec<Recipient>,
}

impl Communication {
    pub fn new(
        sender: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            title: title.into(),
            description: description.into(),
            receivers: Vec::new(),
        }
    }

    /// Append a recipient.
    pub fn with_receiver(mut self, receiver: Recipient) -> Self {
        self.receivers.push(receiver);
        self
    }

    /// Replace the recipient list.
    pub fn with_receivers(mut self, receivers: impl IntoIterator<Item = Recipient>) -> Self {
        self.receivers = receivers.into_iter().collect();
        self
    }
}

/// File content to attach to outgoing messages.
///
/// The source is read exactly once, when the messages are assembled. Send
/// calls take attachments by value, so a consumed attachment cannot be
/// passed to a second call.
pub struct Attachment {
    filename: String,
    source: Box<dyn Read + Send>,
}

impl Attachment {
    /// Attach any readable source under the given filename.
    pub fn new(filename: impl Into<String>, source: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            source: Box::new(source),
        }
    }

    /// Attach in-memory content.
    pub fn from_bytes(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::new(filename, Cursor::new(content.into()))
    }

    /// Open a file and attach it under its own file name.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' has no file name", path.display()),
                )
            })?;
        let file = File::open(path)?;
        Ok(Self::new(filename, file))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Read the whole source, consuming the attachment.
    pub fn into_content(mut self) -> std::io::Result<(String, Vec<u8>)> {
        let mut content = Vec::new();
        self.source.read_to_end(&mut content)?;
        Ok((self.filename, content))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}
