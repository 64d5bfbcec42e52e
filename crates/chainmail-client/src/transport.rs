//! The transport seam.
//!
//! The real backend is a request/response API storing opaque encrypted
//! blobs, public keys and signatures. The client only ever needs the
//! operations below; mailbox listing, pagination and the rest of the API
//! surface are outside the protocol core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chainmail_crypto::X25519PublicKey;
use chainmail_identity::StorageWrappedPrivateKey;
use chainmail_protocol::{KeyDelivery, MailAddress};
use chainmail_wallet::Address;

use crate::Result;

/// Opaque message identifier assigned by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a transport-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque attachment identifier assigned by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    /// Wrap a transport-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Metadata for one stored attachment.
///
/// The ciphertext bytes live in attachment storage; the record carries
/// the dual integrity hashes needed to check them on the way back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Transport-assigned id. Attachment hashes are signed in id order.
    pub attachment_id: AttachmentId,
    /// Original filename.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// Original (plaintext) size in bytes.
    pub size: usize,
    /// Hash of the original bytes (hex).
    pub plain_hash: String,
    /// Hash of the ciphertext bytes (hex).
    pub cipher_hash: String,
}

/// The stored form of a message: addresses in the clear, content and key
/// material as the envelope protocol produced them.
///
/// A record with a signature is final; the transport must refuse further
/// writes to it. Until then it is a draft and every field may be
/// replaced on the next save.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Transport-assigned id; `None` until first persisted.
    pub message_id: Option<MessageId>,
    /// Sender.
    pub from: MailAddress,
    /// Primary recipients.
    pub to: Vec<MailAddress>,
    /// Carbon-copy recipients.
    pub cc: Vec<MailAddress>,
    /// Blind-carbon-copy recipients.
    pub bcc: Vec<MailAddress>,
    /// Subject line (not encrypted).
    pub subject: String,
    /// RFC 3339 date of the last save, or of the send once signed.
    pub date: String,
    /// Message id this replies to, if any.
    pub in_reply_to: Option<String>,
    /// Thread references, oldest first.
    pub references: Vec<String>,
    /// Encrypted text body (hex), if present.
    pub encrypted_text: Option<String>,
    /// Encrypted HTML body (hex), if present.
    pub encrypted_html: Option<String>,
    /// How the content key travels: wrapped per party, or in the clear.
    pub key_delivery: KeyDelivery,
    /// Attachment metadata.
    pub attachments: Vec<AttachmentRecord>,
    /// `Sign_Mail` signature (hex); present only on sent messages.
    pub signature: Option<String>,
}

/// The operations the protocol core needs from the backend.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Fetch an account's identity bundle; `None` means a new user
    /// (triggers identity generation and publication).
    async fn fetch_identity(
        &self,
        address: &Address,
    ) -> Result<Option<StorageWrappedPrivateKey>>;

    /// Publish a freshly created identity bundle.
    async fn publish_identity(
        &self,
        address: &Address,
        bundle: &StorageWrappedPrivateKey,
    ) -> Result<()>;

    /// Look up the registered public key for a mail-address local part
    /// (wallet address or display name). `None` means the recipient
    /// cannot receive encrypted mail.
    async fn fetch_public_key(&self, local_part: &str) -> Result<Option<X25519PublicKey>>;

    /// Store or replace a message; returns its id.
    async fn persist_message(&self, record: &MessageRecord) -> Result<MessageId>;

    /// Retrieve a stored message.
    async fn fetch_message(&self, id: &MessageId) -> Result<MessageRecord>;

    /// Upload encrypted attachment bytes for a message.
    async fn upload_attachment(&self, message: &MessageId, bytes: Vec<u8>)
        -> Result<AttachmentId>;

    /// Download encrypted attachment bytes.
    async fn download_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<Vec<u8>>;

    /// Remove an uploaded attachment from a draft.
    async fn delete_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<()>;
}

// Shared transports: several clients (or tasks) over one backend handle.
#[async_trait]
impl<T: MailTransport + ?Sized> MailTransport for std::sync::Arc<T> {
    async fn fetch_identity(
        &self,
        address: &Address,
    ) -> Result<Option<StorageWrappedPrivateKey>> {
        (**self).fetch_identity(address).await
    }

    async fn publish_identity(
        &self,
        address: &Address,
        bundle: &StorageWrappedPrivateKey,
    ) -> Result<()> {
        (**self).publish_identity(address, bundle).await
    }

    async fn fetch_public_key(&self, local_part: &str) -> Result<Option<X25519PublicKey>> {
        (**self).fetch_public_key(local_part).await
    }

    async fn persist_message(&self, record: &MessageRecord) -> Result<MessageId> {
        (**self).persist_message(record).await
    }

    async fn fetch_message(&self, id: &MessageId) -> Result<MessageRecord> {
        (**self).fetch_message(id).await
    }

    async fn upload_attachment(
        &self,
        message: &MessageId,
        bytes: Vec<u8>,
    ) -> Result<AttachmentId> {
        (**self).upload_attachment(message, bytes).await
    }

    async fn download_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<Vec<u8>> {
        (**self).download_attachment(message, attachment).await
    }

    async fn delete_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<()> {
        (**self).delete_attachment(message, attachment).await
    }
}
