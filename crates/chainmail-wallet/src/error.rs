//! Error types for wallet operations.

use thiserror::Error;

/// Errors that can occur during wallet operations.
#[derive(Error, Debug)]
pub enum WalletError {
    /// The user declined the signature prompt.
    ///
    /// This is a normal cancellation, not a fault; callers abort the
    /// current operation and leave state untouched.
    #[error("Signature request rejected by user")]
    Rejected,

    /// Signing failed inside the wallet provider.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Signature bytes are malformed (wrong length or recovery id).
    #[error("Invalid signature encoding")]
    InvalidSignature,

    /// Public key recovery from a signature failed.
    #[error("Signer recovery failed")]
    Recovery,

    /// Invalid address encoding.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type for wallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;
