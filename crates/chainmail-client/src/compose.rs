//! Compose state for a message being written.

use chainmail_protocol::{ComposeKind, ContentKey, MailAddress};

use crate::transport::{AttachmentRecord, MessageId};

/// A message under composition.
///
/// Holds the per-message content key for its whole lifetime: every draft
/// save re-encrypts under the same key (so the draft stays reopenable),
/// and the send finalizes with it. A new composition always means a new
/// key.
#[derive(Debug)]
pub struct Compose {
    /// Draft id once first persisted.
    pub(crate) message_id: Option<MessageId>,
    /// How this composition started.
    pub kind: ComposeKind,
    /// Primary recipients.
    pub to: Vec<MailAddress>,
    /// Carbon-copy recipients.
    pub cc: Vec<MailAddress>,
    /// Blind-carbon-copy recipients.
    pub bcc: Vec<MailAddress>,
    /// Subject line.
    pub subject: String,
    /// Plaintext text body.
    pub body_text: String,
    /// Plaintext HTML body.
    pub body_html: String,
    pub(crate) content_key: ContentKey,
    pub(crate) attachments: Vec<AttachmentRecord>,
}

impl Compose {
    pub(crate) fn new(kind: ComposeKind, content_key: ContentKey) -> Self {
        Self {
            message_id: None,
            kind,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            body_text: String::new(),
            body_html: String::new(),
            content_key,
            attachments: Vec::new(),
        }
    }

    /// The draft's id, once it has been persisted.
    pub fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    /// Attachments uploaded so far.
    pub fn attachments(&self) -> &[AttachmentRecord] {
        &self.attachments
    }

    /// The message's content key.
    ///
    /// Stable across draft revisions; a reopened draft resumes with the
    /// key it was created with.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }
}
