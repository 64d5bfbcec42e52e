//! In-memory transport for tests and examples.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chainmail_crypto::X25519PublicKey;
use chainmail_identity::StorageWrappedPrivateKey;
use chainmail_wallet::Address;

use crate::transport::{AttachmentId, MailTransport, MessageId, MessageRecord};
use crate::{ClientError, Result};

#[derive(Default)]
struct Inner {
    identities: HashMap<String, StorageWrappedPrivateKey>,
    aliases: HashMap<String, String>,
    messages: HashMap<String, MessageRecord>,
    attachments: HashMap<(String, String), Vec<u8>>,
    next_message: u64,
    next_attachment: u64,
}

/// A complete in-process [`MailTransport`].
///
/// Behaves like the real backend in the ways the protocol cares about:
/// identities are keyed by lowercase address, display-name aliases
/// resolve to the same identity, and a signed message becomes immutable.
#[derive(Default)]
pub struct InMemoryTransport {
    inner: Mutex<Inner>,
}

impl InMemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display-name alias for an account, the way the real
    /// backend resolves registered names to wallet addresses.
    pub async fn register_alias(&self, alias: &str, address: &Address) {
        let mut inner = self.inner.lock().await;
        inner.aliases.insert(alias.to_lowercase(), address.to_hex());
    }
}

#[async_trait]
impl MailTransport for InMemoryTransport {
    async fn fetch_identity(
        &self,
        address: &Address,
    ) -> Result<Option<StorageWrappedPrivateKey>> {
        let inner = self.inner.lock().await;
        Ok(inner.identities.get(&address.to_hex()).cloned())
    }

    async fn publish_identity(
        &self,
        address: &Address,
        bundle: &StorageWrappedPrivateKey,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.identities.insert(address.to_hex(), bundle.clone());
        Ok(())
    }

    async fn fetch_public_key(&self, local_part: &str) -> Result<Option<X25519PublicKey>> {
        let inner = self.inner.lock().await;
        let key = local_part.to_lowercase();
        let address = if inner.identities.contains_key(&key) {
            key
        } else {
            match inner.aliases.get(&key) {
                Some(address) => address.clone(),
                None => return Ok(None),
            }
        };
        Ok(inner
            .identities
            .get(&address)
            .map(|bundle| bundle.public_key.clone()))
    }

    async fn persist_message(&self, record: &MessageRecord) -> Result<MessageId> {
        let mut inner = self.inner.lock().await;
        let id = match &record.message_id {
            Some(id) => {
                let existing = inner
                    .messages
                    .get(id.as_str())
                    .ok_or_else(|| ClientError::MessageNotFound(id.to_string()))?;
                if existing.signature.is_some() {
                    return Err(ClientError::Transport(
                        "message already sent and immutable".into(),
                    ));
                }
                id.clone()
            }
            None => {
                inner.next_message += 1;
                MessageId::new(format!("msg-{}", inner.next_message))
            }
        };
        let mut stored = record.clone();
        stored.message_id = Some(id.clone());
        inner.messages.insert(id.as_str().to_string(), stored);
        Ok(id)
    }

    async fn fetch_message(&self, id: &MessageId) -> Result<MessageRecord> {
        let inner = self.inner.lock().await;
        inner
            .messages
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::MessageNotFound(id.to_string()))
    }

    async fn upload_attachment(
        &self,
        message: &MessageId,
        bytes: Vec<u8>,
    ) -> Result<AttachmentId> {
        let mut inner = self.inner.lock().await;
        if !inner.messages.contains_key(message.as_str()) {
            return Err(ClientError::MessageNotFound(message.to_string()));
        }
        inner.next_attachment += 1;
        let id = AttachmentId::new(format!("att-{:06}", inner.next_attachment));
        inner
            .attachments
            .insert((message.as_str().to_string(), id.as_str().to_string()), bytes);
        Ok(id)
    }

    async fn download_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<Vec<u8>> {
        let inner = self.inner.lock().await;
        inner
            .attachments
            .get(&(
                message.as_str().to_string(),
                attachment.as_str().to_string(),
            ))
            .cloned()
            .ok_or_else(|| {
                ClientError::Transport(format!("attachment {} not found", attachment.as_str()))
            })
    }

    async fn delete_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentId,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.attachments.remove(&(
            message.as_str().to_string(),
            attachment.as_str().to_string(),
        ));
        Ok(())
    }
}
