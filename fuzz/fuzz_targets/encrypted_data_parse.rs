//! Fuzz target for `EncryptedData::from_bytes`.
//!
//! Parsing arbitrary bytes must succeed or fail cleanly, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use chainmail_crypto::EncryptedData;

fuzz_target!(|data: &[u8]| {
    if let Ok(encrypted) = EncryptedData::from_bytes(data) {
        // Nonce is always 24 bytes and the wire roundtrip is lossless.
        assert_eq!(encrypted.nonce.as_bytes().len(), 24);

        let bytes = encrypted.to_bytes();
        let roundtrip = EncryptedData::from_bytes(&bytes).unwrap();
        assert_eq!(encrypted.nonce.as_bytes(), roundtrip.nonce.as_bytes());
        assert_eq!(encrypted.ciphertext, roundtrip.ciphertext);
    }
});
