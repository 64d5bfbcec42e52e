//! The high-level mail client.

use chrono::Utc;
use tracing::{debug, info, warn};

use chainmail_crypto::{Hash256, X25519PublicKey};
use chainmail_identity::{
    protect_private_key, verify_key_bundle, IdentityKeyPair, Session, StorageWrappedPrivateKey,
};
use chainmail_protocol::{
    assemble, decrypt_attachment, decrypt_body, disassemble, encrypt_attachment, encrypt_body,
    forward_subject, reply_subject, sign_mail, unwrap_key, verify_mail, wrap_key, ComposeKind,
    ContentKey, KeyDelivery, MailAddress, MailDigest, ProtocolError, ReaderIdentity,
    WrappedKeyEnvelope,
};
use chainmail_wallet::{Address, WalletSignature, WalletSigner};

use crate::compose::Compose;
use crate::transport::{AttachmentRecord, MailTransport, MessageId, MessageRecord};
use crate::{ClientError, Result};

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Domain appended to mail addresses, e.g. `chainmail.xyz`.
    pub mail_domain: String,
    /// Registered display name for this account, if any.
    pub display_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mail_domain: "chainmail.xyz".into(),
            display_name: None,
        }
    }
}

/// A decrypted message.
#[derive(Debug)]
pub struct OpenedMail {
    /// Decrypted text body; empty if the message had none.
    pub text: String,
    /// Decrypted HTML body; empty if the message had none.
    pub html: String,
    content_key: ContentKey,
}

impl OpenedMail {
    /// The message's content key, needed to decrypt its attachments.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }
}

/// Result of a successful send.
#[derive(Debug)]
pub struct SendReceipt {
    /// The final message id.
    pub message_id: MessageId,
    /// The `Sign_Mail` signature that sealed the message.
    pub signature: WalletSignature,
}

/// The ChainMail client: one logged-in account over a wallet and a
/// transport.
pub struct MailClient<W, T> {
    wallet: W,
    transport: T,
    config: ClientConfig,
    session: Session,
    identity: StorageWrappedPrivateKey,
}

impl<W: WalletSigner, T: MailTransport> MailClient<W, T> {
    /// Log in: load the account's identity bundle, creating and
    /// publishing one on first login.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and wallet errors. If the user
    /// rejects the first-login signature prompts, no identity is
    /// published and login can simply be retried.
    pub async fn login(wallet: W, transport: T, config: ClientConfig) -> Result<Self> {
        let address = wallet.address();
        let identity = match transport.fetch_identity(&address).await? {
            Some(bundle) => {
                if !verify_key_bundle(&bundle, &address) {
                    warn!(%address, "stored identity bundle fails its attestation check");
                }
                debug!(%address, "loaded existing identity bundle");
                bundle
            }
            None => {
                info!(%address, "no identity registered; generating keypair");
                let keypair = IdentityKeyPair::generate();
                let bundle = protect_private_key(&keypair, &wallet).await?;
                transport.publish_identity(&address, &bundle).await?;
                bundle
            }
        };

        Ok(Self {
            wallet,
            transport,
            config,
            session: Session::new(),
            identity,
        })
    }

    /// The logged-in account address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// The account's identity bundle as published.
    pub fn identity(&self) -> &StorageWrappedPrivateKey {
        &self.identity
    }

    /// The account's own mail address.
    pub fn mail_address(&self) -> MailAddress {
        let local = self
            .config
            .display_name
            .clone()
            .unwrap_or_else(|| self.address().to_hex());
        MailAddress::new(local.clone(), format!("{local}@{}", self.config.mail_domain))
    }

    fn reader_identity(&self) -> ReaderIdentity {
        ReaderIdentity::new(&self.address(), self.config.display_name.as_deref())
    }

    /// End the session, dropping any cached key material.
    pub async fn logout(&self) {
        self.session.clear().await;
        debug!("session cleared");
    }

    // ---- composition ----

    /// Start a new message with a fresh content key.
    pub fn compose(&self) -> Compose {
        Compose::new(ComposeKind::New, ContentKey::generate(&self.address().to_hex()))
    }

    /// Start a reply to a received message.
    pub fn compose_reply(&self, source: &MessageRecord) -> Compose {
        let mut references = source.references.clone();
        if let Some(id) = &source.message_id {
            references.push(id.as_str().to_string());
        }
        let mut compose = Compose::new(
            ComposeKind::Reply {
                in_reply_to: source
                    .message_id
                    .as_ref()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_default(),
                references,
            },
            ContentKey::generate(&self.address().to_hex()),
        );
        compose.to = vec![source.from.clone()];
        compose.subject = reply_subject(&source.subject);
        compose
    }

    /// Start a forward of a received message, prefilled with its
    /// decrypted text body.
    pub fn compose_forward(&self, source: &MessageRecord, body_text: String) -> Compose {
        let mut compose = Compose::new(
            ComposeKind::Forward {
                source: source
                    .message_id
                    .as_ref()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_default(),
            },
            ContentKey::generate(&self.address().to_hex()),
        );
        compose.subject = forward_subject(&source.subject);
        compose.body_text = body_text;
        compose
    }

    /// Persist the current compose state as a draft.
    ///
    /// Drafts are always encrypted; the content key is wrapped for the
    /// sender alone (index 0) so the draft can be reopened later. Every
    /// save replaces the previous revision under the same content key.
    ///
    /// # Errors
    ///
    /// A rejected wallet prompt aborts the save and leaves the compose
    /// state untouched.
    pub async fn save_draft(&self, compose: &mut Compose) -> Result<()> {
        let record = self.draft_record(compose).await?;
        let id = self.transport.persist_message(&record).await?;
        compose.message_id = Some(id);
        Ok(())
    }

    async fn draft_record(&self, compose: &Compose) -> Result<MessageRecord> {
        let unlocked = self.session.unlocked(&self.identity, &self.wallet).await?;

        let wrapped = wrap_key(
            &compose.content_key,
            unlocked.private_key(),
            unlocked.public_key(),
        )?;
        let envelope = WrappedKeyEnvelope {
            encrypted_keys: vec![wrapped],
            public_keys: vec![unlocked.public_key().clone()],
        };
        drop(unlocked);

        let encrypted_text = if compose.body_text.is_empty() {
            None
        } else {
            Some(encrypt_body(&compose.body_text, &compose.content_key)?)
        };
        let encrypted_html = if compose.body_html.is_empty() {
            None
        } else {
            Some(encrypt_body(&compose.body_html, &compose.content_key)?)
        };

        let (in_reply_to, references) = match &compose.kind {
            ComposeKind::Reply {
                in_reply_to,
                references,
            } => (Some(in_reply_to.clone()), references.clone()),
            _ => (None, Vec::new()),
        };

        Ok(MessageRecord {
            message_id: compose.message_id.clone(),
            from: self.mail_address(),
            to: compose.to.clone(),
            cc: compose.cc.clone(),
            bcc: compose.bcc.clone(),
            subject: compose.subject.clone(),
            date: Utc::now().to_rfc3339(),
            in_reply_to,
            references,
            encrypted_text,
            encrypted_html,
            key_delivery: KeyDelivery::Encrypted(envelope),
            attachments: compose.attachments.clone(),
            signature: None,
        })
    }

    /// Reopen a stored draft for further editing.
    ///
    /// Recovers the draft's content key from the sender slot so later
    /// saves and the final send keep using it.
    ///
    /// # Errors
    ///
    /// Fails if the record is not this account's draft or the key cannot
    /// be unwrapped.
    pub async fn open_draft(&self, id: &MessageId) -> Result<Compose> {
        let record = self.transport.fetch_message(id).await?;

        let content_key = match &record.key_delivery {
            KeyDelivery::Plaintext(key) => key.clone(),
            KeyDelivery::Encrypted(envelope) => {
                let wrapped = envelope
                    .encrypted_keys
                    .first()
                    .ok_or(ProtocolError::KeyNotFound)?;
                let sender_public = envelope
                    .public_keys
                    .first()
                    .ok_or(ProtocolError::KeyNotFound)?;
                let unlocked = self.session.unlocked(&self.identity, &self.wallet).await?;
                unwrap_key(wrapped, unlocked.private_key(), sender_public)?
            }
        };

        let body_text = match &record.encrypted_text {
            Some(ciphertext) => decrypt_body(ciphertext, &content_key)?,
            None => String::new(),
        };
        let body_html = match &record.encrypted_html {
            Some(ciphertext) => decrypt_body(ciphertext, &content_key)?,
            None => String::new(),
        };

        let kind = match &record.in_reply_to {
            Some(in_reply_to) => ComposeKind::Reply {
                in_reply_to: in_reply_to.clone(),
                references: record.references.clone(),
            },
            None => ComposeKind::New,
        };

        let mut compose = Compose::new(kind, content_key);
        compose.message_id = record.message_id.clone();
        compose.to = record.to;
        compose.cc = record.cc;
        compose.bcc = record.bcc;
        compose.subject = record.subject;
        compose.body_text = body_text;
        compose.body_html = body_html;
        compose.attachments = record.attachments;
        Ok(compose)
    }

    /// Encrypt and upload an attachment, recording both integrity hashes.
    ///
    /// Persists the draft first if it has no id yet (attachment storage
    /// is keyed by message).
    pub async fn add_attachment(
        &self,
        compose: &mut Compose,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<()> {
        if compose.message_id.is_none() {
            self.save_draft(compose).await?;
        }
        let message_id = compose.message_id.clone().ok_or(ClientError::NoDraft)?;

        let encrypted = encrypt_attachment(bytes, &compose.content_key)?;
        let attachment_id = self
            .transport
            .upload_attachment(&message_id, encrypted.ciphertext)
            .await?;

        compose.attachments.push(AttachmentRecord {
            attachment_id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
            plain_hash: encrypted.plain_hash.to_hex(),
            cipher_hash: encrypted.cipher_hash.to_hex(),
        });
        Ok(())
    }

    /// Remove an uploaded attachment from the draft.
    pub async fn remove_attachment(&self, compose: &mut Compose, index: usize) -> Result<()> {
        if index >= compose.attachments.len() {
            return Ok(());
        }
        let record = compose.attachments.remove(index);
        if let Some(message_id) = &compose.message_id {
            self.transport
                .delete_attachment(message_id, &record.attachment_id)
                .await?;
        }
        Ok(())
    }

    // ---- send ----

    /// Finalize and send the composed message.
    ///
    /// Looks up every recipient's public key, assembles the wrapped-key
    /// envelope (or falls back to plaintext key delivery when any
    /// recipient has none), signs the canonical digest with the wallet,
    /// and persists the sealed record.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NoRecipients`] if `to` is empty.
    /// - A rejected wallet prompt aborts the send; the draft and its
    ///   content survive unchanged for a later retry.
    pub async fn send(&self, compose: &mut Compose) -> Result<SendReceipt> {
        if compose.to.is_empty() {
            return Err(ClientError::NoRecipients);
        }

        // Persist the draft state first, as every send starts from a saved
        // draft.
        self.save_draft(compose).await?;

        // Collect recipient keys in address-list order: to, cc, bcc.
        let recipients: Vec<&MailAddress> = compose
            .to
            .iter()
            .chain(compose.cc.iter())
            .chain(compose.bcc.iter())
            .collect();
        let mut recipient_keys: Vec<Option<X25519PublicKey>> =
            Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            let key = self
                .transport
                .fetch_public_key(&recipient.local_part())
                .await?;
            if key.is_none() {
                debug!(address = %recipient.address, "recipient has no registered key");
            }
            recipient_keys.push(key);
        }

        let delivery = {
            let unlocked = self.session.unlocked(&self.identity, &self.wallet).await?;
            assemble(&compose.content_key, unlocked.private_key(), &recipient_keys)?
        };
        if delivery.is_plaintext() {
            warn!(
                message_id = ?compose.message_id,
                "recipient without registered key; sending with plaintext content key"
            );
        }

        // Encrypt the bodies (already done for the draft, but the record
        // fields are rebuilt here so the signed hashes match exactly what
        // is persisted).
        let encrypted_text = if compose.body_text.is_empty() {
            None
        } else {
            Some(encrypt_body(&compose.body_text, &compose.content_key)?)
        };
        let encrypted_html = if compose.body_html.is_empty() {
            None
        } else {
            Some(encrypt_body(&compose.body_html, &compose.content_key)?)
        };

        // The signature covers content as it travels: ciphertext hashes
        // for an encryptable message, plaintext hashes in degraded mode.
        let (text_hash, html_hash) = if delivery.is_plaintext() {
            (
                Hash256::hash(compose.body_text.as_bytes()),
                Hash256::hash(compose.body_html.as_bytes()),
            )
        } else {
            (
                Hash256::hash(encrypted_text.as_deref().unwrap_or_default().as_bytes()),
                Hash256::hash(encrypted_html.as_deref().unwrap_or_default().as_bytes()),
            )
        };

        // Attachment hashes are signed in attachment-id order.
        let mut sorted_attachments = compose.attachments.clone();
        sorted_attachments.sort_by(|a, b| a.attachment_id.cmp(&b.attachment_id));
        let attachment_hashes: Vec<String> = sorted_attachments
            .iter()
            .map(|a| {
                if delivery.is_plaintext() {
                    a.plain_hash.clone()
                } else {
                    a.cipher_hash.clone()
                }
            })
            .collect();

        let date = Utc::now().to_rfc3339();
        let digest = MailDigest::build(
            &self.mail_address(),
            &compose.to,
            &compose.cc,
            &date,
            &compose.subject,
            &text_hash,
            &html_hash,
            attachment_hashes,
            &delivery,
        );

        // The one user-interruptible step: a rejection aborts here, before
        // anything final is persisted.
        let signature = sign_mail(&digest, &self.wallet).await?;

        let (in_reply_to, references) = match &compose.kind {
            ComposeKind::Reply {
                in_reply_to,
                references,
            } => (Some(in_reply_to.clone()), references.clone()),
            _ => (None, Vec::new()),
        };

        let record = MessageRecord {
            message_id: compose.message_id.clone(),
            from: self.mail_address(),
            to: compose.to.clone(),
            cc: compose.cc.clone(),
            bcc: compose.bcc.clone(),
            subject: compose.subject.clone(),
            date,
            in_reply_to,
            references,
            encrypted_text,
            encrypted_html,
            key_delivery: delivery,
            attachments: compose.attachments.clone(),
            signature: Some(signature.to_hex()),
        };
        let message_id = self.transport.persist_message(&record).await?;
        info!(%message_id, "message sent");

        compose.message_id = Some(message_id.clone());
        Ok(SendReceipt {
            message_id,
            signature,
        })
    }

    // ---- read ----

    /// Fetch and decrypt a message this account is a party to.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::KeyNotFound`] (wrapped in
    ///   [`ClientError::Protocol`]) if this account is not a party.
    /// - [`ProtocolError::ContentDecryptionFailed`] if a body does not
    ///   decrypt under the recovered key.
    pub async fn open_message(&self, id: &MessageId) -> Result<OpenedMail> {
        let record = self.transport.fetch_message(id).await?;

        let content_key = match &record.key_delivery {
            KeyDelivery::Plaintext(key) => {
                debug!(%id, "message uses plaintext key delivery");
                key.clone()
            }
            KeyDelivery::Encrypted(_) => {
                let unlocked = self.session.unlocked(&self.identity, &self.wallet).await?;
                disassemble(
                    &record.key_delivery,
                    &self.reader_identity(),
                    &record.from,
                    &record.to,
                    &record.cc,
                    &record.bcc,
                    unlocked.private_key(),
                )?
            }
        };

        let text = match &record.encrypted_text {
            Some(ciphertext) => decrypt_body(ciphertext, &content_key)?,
            None => String::new(),
        };
        let html = match &record.encrypted_html {
            Some(ciphertext) => decrypt_body(ciphertext, &content_key)?,
            None => String::new(),
        };

        Ok(OpenedMail {
            text,
            html,
            content_key,
        })
    }

    /// Download and decrypt one attachment of an opened message.
    ///
    /// Enforces both integrity hashes recorded at upload time.
    pub async fn open_attachment(
        &self,
        message: &MessageId,
        attachment: &AttachmentRecord,
        content_key: &ContentKey,
    ) -> Result<Vec<u8>> {
        let ciphertext = self
            .transport
            .download_attachment(message, &attachment.attachment_id)
            .await?;
        let plain_hash = Hash256::from_hex(&attachment.plain_hash)?;
        let cipher_hash = Hash256::from_hex(&attachment.cipher_hash)?;
        Ok(decrypt_attachment(
            &ciphertext,
            content_key,
            &plain_hash,
            &cipher_hash,
        )?)
    }

    /// Verify a stored message's `Sign_Mail` signature without decrypting
    /// anything.
    ///
    /// Returns `false` for unsigned records (drafts) and for any content
    /// or metadata mutation after signing.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnresolvableSender`] if the sender's local part is
    /// a display name rather than a wallet address; verification needs
    /// the claimed signer address.
    pub async fn verify_message(&self, id: &MessageId) -> Result<bool> {
        let record = self.transport.fetch_message(id).await?;
        let Some(signature_hex) = &record.signature else {
            return Ok(false);
        };
        let Ok(signature) = WalletSignature::from_hex(signature_hex) else {
            return Ok(false);
        };

        let claimed = Address::from_hex(&record.from.local_part())
            .map_err(|_| ClientError::UnresolvableSender(record.from.address.clone()))?;

        let (text_hash, html_hash) = match &record.key_delivery {
            KeyDelivery::Encrypted(_) => (
                Hash256::hash(record.encrypted_text.as_deref().unwrap_or_default().as_bytes()),
                Hash256::hash(record.encrypted_html.as_deref().unwrap_or_default().as_bytes()),
            ),
            KeyDelivery::Plaintext(key) => {
                let text = match &record.encrypted_text {
                    Some(ciphertext) => decrypt_body(ciphertext, key)?,
                    None => String::new(),
                };
                let html = match &record.encrypted_html {
                    Some(ciphertext) => decrypt_body(ciphertext, key)?,
                    None => String::new(),
                };
                (Hash256::hash(text.as_bytes()), Hash256::hash(html.as_bytes()))
            }
        };

        let mut sorted_attachments = record.attachments.clone();
        sorted_attachments.sort_by(|a, b| a.attachment_id.cmp(&b.attachment_id));
        let attachment_hashes: Vec<String> = sorted_attachments
            .iter()
            .map(|a| {
                if record.key_delivery.is_plaintext() {
                    a.plain_hash.clone()
                } else {
                    a.cipher_hash.clone()
                }
            })
            .collect();

        let digest = MailDigest::build(
            &record.from,
            &record.to,
            &record.cc,
            &record.date,
            &record.subject,
            &text_hash,
            &html_hash,
            attachment_hashes,
            &record.key_delivery,
        );
        Ok(verify_mail(&digest, &signature, &claimed))
    }
}

impl<W: WalletSigner, T> std::fmt::Debug for MailClient<W, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailClient")
            .field("address", &self.wallet.address())
            .finish_non_exhaustive()
    }
}
