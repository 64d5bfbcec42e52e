//! # chainmail-client
//!
//! The high-level ChainMail client. Wires the identity key store, the
//! envelope protocol and the wallet together over an abstract transport:
//!
//! - first-login identity bootstrap (generate, protect, publish)
//! - compose / reply / forward with per-message content keys
//! - draft save and reopen (same content key across revisions)
//! - send with all-or-nothing envelope assembly and the explicit
//!   plaintext fallback when a recipient has no registered key
//! - read with positional wrapped-key lookup and signature verification
//!
//! The transport itself (HTTP API, storage service) lives outside this
//! workspace; [`transport::MailTransport`] is the seam, and
//! [`memory::InMemoryTransport`] is the in-process implementation used by
//! tests and examples.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod compose;
pub mod error;
pub mod memory;
pub mod transport;

pub use client::{ClientConfig, MailClient, OpenedMail, SendReceipt};
pub use compose::Compose;
pub use error::{ClientError, Result};
pub use memory::InMemoryTransport;
pub use transport::{AttachmentId, AttachmentRecord, MailTransport, MessageId, MessageRecord};
