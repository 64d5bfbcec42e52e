//! BLAKE3 hashing primitives.
//!
//! `Hash256` is the fixed collision-resistant hash used for every protocol
//! digest: body-part hashes, attachment integrity hashes, and the per-item
//! hashes of wrapped keys and public keys that go into the mail signature.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// A 256-bit (32-byte) BLAKE3 hash value.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Hash size in bytes.
    pub const SIZE: usize = 32;

    /// Create a `Hash256` from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(crate::CryptoError::InvalidHashLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash a single input.
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(*hash.as_bytes())
    }

    /// Hash multiple inputs.
    ///
    /// Each input is length-prefixed to prevent boundary ambiguity.
    pub fn hash_many(inputs: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for input in inputs {
            hasher.update(&(input.len() as u64).to_le_bytes());
            hasher.update(input);
        }
        let hash = hasher.finalize();
        Self(*hash.as_bytes())
    }

    /// Format as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid 64-character hex.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 64 {
            return Err(crate::CryptoError::InvalidHashLength {
                expected: 64,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s)
            .map_err(|e| crate::CryptoError::InvalidHexFormat(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for Hash256 {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time: these hashes cover key material.
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Hash256 {}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({}..)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
