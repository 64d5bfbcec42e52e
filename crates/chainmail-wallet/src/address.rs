//! EVM account addresses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::{Result, WalletError};

/// Size of an address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// A 20-byte EVM account address.
///
/// Displayed and serialized as `0x`-prefixed lowercase hex. Comparison is
/// byte-wise, so differently-cased hex inputs compare equal after parsing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Derive an address from an uncompressed secp256k1 public key.
    ///
    /// Standard EVM derivation: the low 20 bytes of the Keccak-256 hash of
    /// the 64-byte public key material (the `0x04` prefix stripped).
    pub fn from_uncompressed_pubkey(pubkey: &[u8]) -> Result<Self> {
        let body = match pubkey.len() {
            65 if pubkey[0] == 0x04 => &pubkey[1..],
            64 => pubkey,
            _ => {
                return Err(WalletError::InvalidAddress(
                    "expected uncompressed secp256k1 public key".into(),
                ))
            }
        };
        let hash = Keccak256::digest(body);
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&hash[12..]);
        Ok(Self(bytes))
    }

    /// Parse from a hex string, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 40 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        if bytes.len() != ADDRESS_SIZE {
            return Err(WalletError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Get the address as bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Format as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
