//! # chainmail-wallet
//!
//! Wallet abstraction for the ChainMail protocol. The wallet is the sole
//! root of trust: its EIP-712 typed-data signatures derive the storage key
//! that protects the identity private key, attest published key bundles,
//! and seal outgoing mail metadata.
//!
//! Signatures produced here are deterministic (RFC 6979), which the
//! protocol depends on: signing the same salt twice must re-derive the
//! same storage key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod error;
pub mod signer;
pub mod typed_data;

pub use address::Address;
pub use error::{Result, WalletError};
pub use signer::{verify_typed_data, LocalWallet, WalletSignature, WalletSigner};
pub use typed_data::{Eip712Domain, TypedData};
