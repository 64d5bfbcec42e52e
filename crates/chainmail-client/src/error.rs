//! Error types for client operations.

use thiserror::Error;

use chainmail_wallet::WalletError;

/// Errors that can occur during high-level mail operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A message had no recipients at send time.
    #[error("Message has no recipients")]
    NoRecipients,

    /// The transport could not find the requested message.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The operation needs a draft that was never persisted.
    #[error("No draft persisted for this message")]
    NoDraft,

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The sender of a fetched message could not be resolved to a wallet
    /// address for verification.
    #[error("Cannot resolve sender address: {0}")]
    UnresolvableSender(String),

    /// Wallet error (including user rejection of the signature prompt).
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Identity error.
    #[error("Identity error: {0}")]
    Identity(#[from] chainmail_identity::IdentityError),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] chainmail_protocol::ProtocolError),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] chainmail_crypto::CryptoError),
}

impl ClientError {
    /// Whether this error is the user declining a wallet prompt.
    ///
    /// Rejection is a normal cancellation: the surrounding operation was
    /// aborted cleanly and no state was lost, so callers usually dismiss
    /// it silently rather than surfacing a failure.
    pub fn is_signature_rejected(&self) -> bool {
        matches!(
            self,
            Self::Wallet(WalletError::Rejected)
                | Self::Identity(chainmail_identity::IdentityError::Wallet(
                    WalletError::Rejected
                ))
                | Self::Protocol(chainmail_protocol::ProtocolError::Wallet(
                    WalletError::Rejected
                ))
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
