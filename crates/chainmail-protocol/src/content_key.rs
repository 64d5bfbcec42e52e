//! The per-message content key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The symmetric secret encrypting one message's bodies and attachments.
///
/// A long textual secret rather than raw key bytes: 256 random bits,
/// base64-encoded, inside a fixed sentence naming the sender. Generated
/// fresh for every new message and reused across draft revisions of that
/// message; never persisted in the clear except in the degraded
/// plaintext-delivery mode.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey(String);

impl ContentKey {
    /// Generate a fresh content key for a message from `sender_account`.
    pub fn generate(sender_account: &str) -> Self {
        let mut bits = [0u8; 32];
        OsRng.fill_bytes(&mut bits);
        let encoded = BASE64.encode(bits);
        Self(format!(
            "Encryption key of this mail from {sender_account} is {encoded}"
        ))
    }

    /// Rebuild a content key recovered from an envelope or plaintext field.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// The secret text, used as the passphrase for the content cipher.
    ///
    /// # Security
    ///
    /// Avoid logging or persisting the returned string.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for ContentKey {}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentKey([REDACTED])")
    }
}

// Serialized only on the degraded plaintext path; everywhere else the key
// travels wrapped.
impl Serialize for ContentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}
