//! # chainmail-crypto
//!
//! Cryptographic primitives for the ChainMail envelope encryption protocol:
//!
//! - **X25519** key agreement between long-term identity keys
//! - **XChaCha20-Poly1305** authenticated encryption for key wrapping
//! - **Argon2id + XChaCha20-Poly1305** passphrase cipher for mail content
//! - **BLAKE3** for all protocol hashes and key derivation
//!
//! ## Security
//!
//! All secret material uses `zeroize` for memory cleanup and `subtle` for
//! constant-time comparison. Nonces are always freshly random; no operation
//! in this crate reuses a (key, nonce) pair.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod passphrase;
pub mod symmetric;
pub mod x25519;

#[cfg(test)]
mod proptests;

pub use error::{CryptoError, Result};
pub use hash::Hash256;
pub use symmetric::{decrypt, encrypt, EncryptedData, Nonce, SymmetricKey, KEY_SIZE, NONCE_SIZE};
pub use x25519::{SharedSecret, X25519PrivateKey, X25519PublicKey, PUBLIC_KEY_SIZE};
