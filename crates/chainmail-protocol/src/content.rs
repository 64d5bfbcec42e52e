//! Content encryption for bodies and attachments.
//!
//! Bodies (text and HTML parts) and attachments are encrypted under the
//! message's content key with the passphrase cipher - a different KDF and
//! wire format from the wrap cipher, because the content key is a long
//! textual secret rather than a fixed-length binary key.
//!
//! Attachments additionally carry two integrity hashes: one of the
//! original bytes and one of the ciphertext, so corruption is detectable
//! both before decryption (transit damage) and after (sender/recipient
//! disagreement).

use chainmail_crypto::passphrase::{self, PassphraseCiphertext};
use chainmail_crypto::Hash256;

use crate::content_key::ContentKey;
use crate::{ProtocolError, Result};

/// Encrypt a body part (text or HTML) to its hex wire form.
///
/// Draft and final content go through the same path.
///
/// # Errors
///
/// Returns an error if the cipher fails.
pub fn encrypt_body(plaintext: &str, key: &ContentKey) -> Result<String> {
    let encrypted = passphrase::encrypt(key.expose(), plaintext.as_bytes())?;
    Ok(encrypted.to_hex())
}

/// Decrypt a body part from its hex wire form.
///
/// # Errors
///
/// Returns [`ProtocolError::ContentDecryptionFailed`] on malformed
/// ciphertext or a wrong content key. Callers distinguish this from the
/// missing-key condition ([`ProtocolError::KeyNotFound`]); the two have
/// different user-facing remedies.
pub fn decrypt_body(ciphertext_hex: &str, key: &ContentKey) -> Result<String> {
    let ciphertext = PassphraseCiphertext::from_hex(ciphertext_hex)
        .map_err(|_| ProtocolError::ContentDecryptionFailed)?;
    let plaintext = passphrase::decrypt(key.expose(), &ciphertext)
        .map_err(|_| ProtocolError::ContentDecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|_| ProtocolError::ContentDecryptionFailed)
}

/// An encrypted attachment with its dual integrity hashes.
#[derive(Clone, Debug)]
pub struct EncryptedAttachment {
    /// Ciphertext bytes as uploaded to attachment storage.
    pub ciphertext: Vec<u8>,
    /// Hash of the original bytes.
    pub plain_hash: Hash256,
    /// Hash of the ciphertext bytes.
    pub cipher_hash: Hash256,
}

/// Encrypt attachment bytes, computing both integrity hashes.
///
/// # Errors
///
/// Returns an error if the cipher fails.
pub fn encrypt_attachment(bytes: &[u8], key: &ContentKey) -> Result<EncryptedAttachment> {
    let plain_hash = Hash256::hash(bytes);
    let ciphertext = passphrase::encrypt(key.expose(), bytes)?.to_bytes();
    let cipher_hash = Hash256::hash(&ciphertext);
    Ok(EncryptedAttachment {
        ciphertext,
        plain_hash,
        cipher_hash,
    })
}

/// Decrypt attachment bytes, enforcing both integrity hashes.
///
/// The ciphertext hash is checked before decryption (transit corruption),
/// the plaintext hash after (the recovered bytes match what the sender
/// actually hashed).
///
/// # Errors
///
/// - [`ProtocolError::AttachmentHashMismatch`] if either hash check fails.
/// - [`ProtocolError::ContentDecryptionFailed`] on malformed ciphertext or
///   a wrong content key.
pub fn decrypt_attachment(
    ciphertext: &[u8],
    key: &ContentKey,
    plain_hash: &Hash256,
    cipher_hash: &Hash256,
) -> Result<Vec<u8>> {
    if &Hash256::hash(ciphertext) != cipher_hash {
        return Err(ProtocolError::AttachmentHashMismatch { stage: "ciphertext" });
    }

    let parsed = PassphraseCiphertext::from_bytes(ciphertext)
        .map_err(|_| ProtocolError::ContentDecryptionFailed)?;
    let plaintext = passphrase::decrypt(key.expose(), &parsed)
        .map_err(|_| ProtocolError::ContentDecryptionFailed)?;

    if &Hash256::hash(&plaintext) != plain_hash {
        return Err(ProtocolError::AttachmentHashMismatch { stage: "plaintext" });
    }
    Ok(plaintext)
}
