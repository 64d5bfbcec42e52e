//! Error types for protocol operations.

use thiserror::Error;

/// Errors that can occur during envelope and content operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unwrapping a content key failed: wrong key pair or tampered wrap.
    ///
    /// The AEAD tag check rejects before any key material is produced.
    #[error("Key unwrap failed: wrong key pair or tampered data")]
    UnwrapFailed,

    /// Content decryption failed: malformed ciphertext or wrong content key.
    ///
    /// Distinct from [`ProtocolError::KeyNotFound`]; the two have
    /// different user-facing remedies.
    #[error("Content decryption failed")]
    ContentDecryptionFailed,

    /// The reader is not a party to the message.
    ///
    /// No entry of the address list matches the reader's account or
    /// registered display name, or the matched slot has no wrapped key.
    #[error("No encryption key found for this reader")]
    KeyNotFound,

    /// An attachment failed its integrity check.
    #[error("Attachment hash mismatch ({stage})")]
    AttachmentHashMismatch {
        /// Which hash failed: `"ciphertext"` before decryption or
        /// `"plaintext"` after.
        stage: &'static str,
    },

    /// The wrapped-key envelope violates its structural invariants.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Wallet error (including user rejection of the signature prompt).
    #[error("Wallet error: {0}")]
    Wallet(#[from] chainmail_wallet::WalletError),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] chainmail_crypto::CryptoError),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
