//! # chainmail-identity
//!
//! The Identity Key Store: one X25519 key-agreement keypair per account,
//! created on first login and kept for the account's lifetime.
//!
//! The private half never leaves the client unencrypted. At rest it is
//! wrapped under a *storage key* derived from a wallet signature over a
//! random salt - the wallet signature is deterministic, so re-signing the
//! same salt always re-derives the same storage key, and no password
//! exists anywhere in the system. Losing wallet access permanently loses
//! the identity key; that trade-off is accepted by design.
//!
//! In memory, the decrypted key lives only inside a [`Session`], which is
//! populated lazily on the first decrypt operation and cleared on logout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod keypair;
pub mod session;
pub mod vault;

pub use error::{IdentityError, Result};
pub use keypair::IdentityKeyPair;
pub use session::Session;
pub use vault::{
    protect_private_key, recover_private_key, verify_key_bundle, StorageWrappedPrivateKey,
};
