//! Mail metadata signing.
//!
//! The sender's wallet signs a canonical digest of every security-relevant
//! field of a message: party display strings, date, subject, body-part
//! hashes, attachment hashes, and a hash of **each individual** wrapped
//! key and public key (per-item, so one party's slot can be checked
//! without revealing the others). The digest covers hashes of ciphertext,
//! so verification never requires decryption capability - it attests
//! "this exact ciphertext was sent", not the semantic content underneath.
//!
//! Computed once at send time, immutable thereafter. There is no update
//! path: changed content means a new signature and a new send.

use serde::{Deserialize, Serialize};

use chainmail_crypto::Hash256;
use chainmail_wallet::{
    verify_typed_data, Address, Eip712Domain, TypedData, WalletSignature, WalletSigner,
};

use crate::envelope::KeyDelivery;
use crate::message::MailAddress;
use crate::Result;

/// The canonical, order-fixed view of a message that gets signed.
///
/// `bcc` parties are deliberately absent: their wraps exist in the
/// envelope, but the attested metadata never names them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailDigest {
    /// Sender display string (`Name <address>`).
    pub from: String,
    /// Recipient display strings.
    pub to: Vec<String>,
    /// Carbon-copy display strings.
    pub cc: Vec<String>,
    /// RFC 3339 send date.
    pub date: String,
    /// Subject line.
    pub subject: String,
    /// Hash of the text body part (hex).
    pub text_hash: String,
    /// Hash of the HTML body part (hex).
    pub html_hash: String,
    /// Per-attachment hashes (hex), ordered by attachment id.
    pub attachment_hashes: Vec<String>,
    /// Hash of each wrapped key (hex), in address-list order.
    pub wrapped_key_hashes: Vec<String>,
    /// Hash of each public key (hex), in address-list order.
    pub public_key_hashes: Vec<String>,
}

impl MailDigest {
    /// Build the digest for a message.
    ///
    /// `text_hash`/`html_hash` are hashes of the body parts as they travel:
    /// ciphertext for an encryptable message, plaintext in degraded mode.
    /// The same rule applies to `attachment_hashes`. For an encrypted
    /// delivery every wrapped key and public key is hashed individually;
    /// the plaintext mode contributes empty lists.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        from: &MailAddress,
        to: &[MailAddress],
        cc: &[MailAddress],
        date: &str,
        subject: &str,
        text_hash: &Hash256,
        html_hash: &Hash256,
        attachment_hashes: Vec<String>,
        delivery: &KeyDelivery,
    ) -> Self {
        let (wrapped_key_hashes, public_key_hashes) = match delivery {
            KeyDelivery::Encrypted(envelope) => (
                envelope
                    .encrypted_keys
                    .iter()
                    .map(|k| Hash256::hash(k.as_hex().as_bytes()).to_hex())
                    .collect(),
                envelope
                    .public_keys
                    .iter()
                    .map(|k| Hash256::hash(k.to_hex().as_bytes()).to_hex())
                    .collect(),
            ),
            KeyDelivery::Plaintext(_) => (Vec::new(), Vec::new()),
        };

        Self {
            from: from.display(),
            to: to.iter().map(MailAddress::display).collect(),
            cc: cc.iter().map(MailAddress::display).collect(),
            date: date.to_string(),
            subject: subject.to_string(),
            text_hash: text_hash.to_hex(),
            html_hash: html_hash.to_hex(),
            attachment_hashes,
            wrapped_key_hashes,
            public_key_hashes,
        }
    }

    /// Encode as the `Sign_Mail` EIP-712 struct.
    pub fn to_typed_data(&self) -> TypedData {
        TypedData::new(Eip712Domain::chainmail(), "Sign_Mail")
            .field("from", self.from.as_str())
            .array_field("to", self.to.clone())
            .array_field("cc", self.cc.clone())
            .field("date", self.date.as_str())
            .field("subject", self.subject.as_str())
            .field("text_hash", self.text_hash.as_str())
            .field("html_hash", self.html_hash.as_str())
            .array_field("attachment_hashes", self.attachment_hashes.clone())
            .array_field(
                "encrypted_encryption_key_hashes",
                self.wrapped_key_hashes.clone(),
            )
            .array_field(
                "encryption_public_key_hashes",
                self.public_key_hashes.clone(),
            )
    }
}

/// Sign a mail digest with the sender's wallet.
///
/// # Errors
///
/// Propagates wallet errors; a rejected prompt aborts the send with no
/// side effects.
pub async fn sign_mail<W: WalletSigner + ?Sized>(
    digest: &MailDigest,
    wallet: &W,
) -> Result<WalletSignature> {
    Ok(wallet.sign_typed_data(&digest.to_typed_data()).await?)
}

/// Verify a mail signature against the claimed sender address.
///
/// Needs only public data; any party (or the server) can confirm the
/// message was not altered after signing and genuinely originated from
/// the claimed wallet.
pub fn verify_mail(digest: &MailDigest, signature: &WalletSignature, claimed: &Address) -> bool {
    verify_typed_data(&digest.to_typed_data(), signature, claimed)
}
