//! Passphrase-keyed content cipher.
//!
//! Mail bodies and attachments are encrypted under the per-message content
//! key, which is a long textual secret rather than a fixed-length binary
//! key. This module gives that secret its own key-derivation and wire
//! format, distinct from the wrap cipher in [`crate::symmetric`]:
//! a random per-encryption salt feeds Argon2id, and the derived key drives
//! XChaCha20-Poly1305.
//!
//! Wire format: `[salt (16 bytes)][nonce (24 bytes)][ciphertext + tag]`.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::symmetric::{self, EncryptedData, SymmetricKey, NONCE_SIZE, TAG_SIZE};
use crate::{CryptoError, Result};

/// Size of the per-encryption salt in bytes.
pub const SALT_SIZE: usize = 16;

// Argon2id parameters. The content key carries 256 bits of entropy, so the
// KDF is for domain separation and format, not stretching; moderate cost
// keeps large attachments workable.
const ARGON2_M_COST: u32 = 19 * 1024; // KiB
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Ciphertext produced by the passphrase cipher.
#[derive(Clone)]
pub struct PassphraseCiphertext {
    /// Salt fed to Argon2id.
    pub salt: [u8; SALT_SIZE],
    /// Nonce and AEAD ciphertext.
    pub encrypted: EncryptedData,
}

impl PassphraseCiphertext {
    /// Serialize to bytes (`salt || nonce || ciphertext`).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_SIZE + self.encrypted.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.encrypted.to_bytes());
        out
    }

    /// Deserialize from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is too short to contain salt, nonce
    /// and tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption);
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[..SALT_SIZE]);
        let encrypted = EncryptedData::from_bytes(&bytes[SALT_SIZE..])?;
        Ok(Self { salt, encrypted })
    }

    /// Serialize to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid hex or truncated data.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHexFormat(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for PassphraseCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassphraseCiphertext")
            .field("salt", &hex::encode(&self.salt[..4]))
            .field("len", &self.encrypted.len())
            .finish()
    }
}

/// Derive the content-encryption key for one salt.
fn derive_key(passphrase: &str, salt: &[u8; SALT_SIZE]) -> Result<SymmetricKey> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; ARGON2_OUTPUT_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(SymmetricKey::from_array(key))
}

/// Encrypt plaintext under a passphrase.
///
/// A fresh salt is drawn per call, so encrypting the same content twice
/// yields unrelated ciphertexts.
///
/// # Errors
///
/// Returns an error if key derivation or the AEAD fails.
pub fn encrypt(passphrase: &str, plaintext: &[u8]) -> Result<PassphraseCiphertext> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(passphrase, &salt)?;
    let encrypted = symmetric::encrypt(&key, plaintext)?;
    Ok(PassphraseCiphertext { salt, encrypted })
}

/// Decrypt a passphrase ciphertext.
///
/// # Errors
///
/// Returns `CryptoError::Decryption` on a wrong passphrase or tampered
/// ciphertext.
pub fn decrypt(passphrase: &str, ciphertext: &PassphraseCiphertext) -> Result<Vec<u8>> {
    let key = derive_key(passphrase, &ciphertext.salt)?;
    symmetric::decrypt(&key, &ciphertext.encrypted)
}
