//! Fuzz target for unwrapping arbitrary wrapped-key data.
//!
//! Unwrap must reject garbage and tampered wraps with an error, never
//! panic and never return unauthenticated key material.

#![no_main]

use libfuzzer_sys::fuzz_target;

use chainmail_crypto::X25519PrivateKey;
use chainmail_protocol::{unwrap_key, WrappedKey};

fuzz_target!(|data: &[u8]| {
    let wrapped = WrappedKey::from_hex(hex::encode(data));

    let reader = X25519PrivateKey::from_bytes(&[0x11; 32]).unwrap();
    let sender_public = X25519PrivateKey::from_bytes(&[0x22; 32]).unwrap().public_key();

    let _ = unwrap_key(&wrapped, &reader, &sender_public);
});
