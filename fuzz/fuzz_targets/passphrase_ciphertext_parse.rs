//! Fuzz target for `PassphraseCiphertext::from_bytes`.

#![no_main]

use libfuzzer_sys::fuzz_target;

use chainmail_crypto::passphrase::PassphraseCiphertext;

fuzz_target!(|data: &[u8]| {
    if let Ok(ciphertext) = PassphraseCiphertext::from_bytes(data) {
        let bytes = ciphertext.to_bytes();
        let roundtrip = PassphraseCiphertext::from_bytes(&bytes).unwrap();
        assert_eq!(ciphertext.salt, roundtrip.salt);
        assert_eq!(ciphertext.encrypted.ciphertext, roundtrip.encrypted.ciphertext);
    }
});
