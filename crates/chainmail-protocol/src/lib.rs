//! # chainmail-protocol
//!
//! The envelope encryption protocol: per-message content keys, wrapping
//! them for every party via X25519 key agreement, applying the content
//! cipher to bodies and attachments, and signing mail metadata with the
//! sender's wallet.
//!
//! ## Envelope shape
//!
//! A message carries one wrapped copy of its content key per party, in a
//! list positionally correlated with the address list
//! `[from, ...to, ...cc, ...bcc]`. Index 0 is always the sender's own
//! wrap, so senders can reopen their sent mail and drafts. When any
//! recipient has no registered public key the whole message falls back to
//! carrying the content key in the clear - an explicit degraded mode, not
//! an error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod content;
pub mod content_key;
pub mod envelope;
pub mod error;
pub mod message;
pub mod signing;

#[cfg(test)]
mod proptests;

pub use content::{decrypt_attachment, decrypt_body, encrypt_attachment, encrypt_body, EncryptedAttachment};
pub use content_key::ContentKey;
pub use envelope::{
    assemble, disassemble, party_index, unwrap_key, wrap_key, KeyDelivery, WrappedKey,
    WrappedKeyEnvelope,
};
pub use error::{ProtocolError, Result};
pub use message::{forward_subject, reply_subject, ComposeKind, MailAddress, ReaderIdentity};
pub use signing::{sign_mail, verify_mail, MailDigest};
