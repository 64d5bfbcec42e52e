//! Error types for identity operations.

use thiserror::Error;

/// Errors that can occur during identity key management.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The stored private key could not be decrypted.
    ///
    /// The storage key re-derived from the wallet signature does not match
    /// the one used at protection time - typically a different wallet
    /// account signed the salt. Surfaces at the earliest possible point;
    /// garbage key material is never returned.
    #[error("Private key decryption failed: wallet signature does not match")]
    DecryptionFailed,

    /// The stored bundle is internally inconsistent.
    #[error("Invalid key bundle: {0}")]
    InvalidBundle(String),

    /// Wallet error (including user rejection of the signature prompt).
    #[error("Wallet error: {0}")]
    Wallet(#[from] chainmail_wallet::WalletError),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] chainmail_crypto::CryptoError),
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
