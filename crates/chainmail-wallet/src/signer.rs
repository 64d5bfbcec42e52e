//! Wallet signer trait, signature type, and the local test signer.
//!
//! The production wallet lives outside this crate (a browser extension or
//! hardware device reached through the host application); [`WalletSigner`]
//! is the seam. [`LocalWallet`] is a full in-process implementation used by
//! tests, tooling, and anywhere a raw secp256k1 key is acceptable.

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::typed_data::TypedData;
use crate::{Address, Result, WalletError};

/// Size of a recoverable signature in bytes (`r || s || v`).
pub const SIGNATURE_SIZE: usize = 65;

/// A recoverable secp256k1 wallet signature.
///
/// 65 bytes in the EVM convention: 32-byte `r`, 32-byte `s`, one recovery
/// byte `v` (27 or 28). Serialized as `0x`-prefixed hex on the wire.
#[derive(Clone)]
pub struct WalletSignature {
    bytes: [u8; SIGNATURE_SIZE],
}

impl WalletSignature {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 65 bytes or the recovery byte
    /// is out of range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(WalletError::InvalidSignature);
        }
        let v = bytes[64];
        if !matches!(v, 0 | 1 | 27 | 28) {
            return Err(WalletError::InvalidSignature);
        }
        let mut arr = [0u8; SIGNATURE_SIZE];
        arr.copy_from_slice(bytes);
        // Normalize the recovery byte to the 27/28 convention.
        if arr[64] < 27 {
            arr[64] += 27;
        }
        Ok(Self { bytes: arr })
    }

    /// Get the signature as bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.bytes
    }

    /// Format as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parse from a hex string, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid hex or a malformed signature.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| WalletError::InvalidSignature)?;
        Self::from_bytes(&bytes)
    }

    /// Recover the signer's address from the digest this signature covers.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Recovery` if the signature does not decode to
    /// a valid curve point for the digest.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address> {
        let signature =
            Signature::from_slice(&self.bytes[..64]).map_err(|_| WalletError::Recovery)?;
        let recovery_id =
            RecoveryId::from_byte(self.bytes[64] - 27).ok_or(WalletError::Recovery)?;
        let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|_| WalletError::Recovery)?;
        let point = verifying_key.to_encoded_point(false);
        Address::from_uncompressed_pubkey(point.as_bytes())
    }
}

impl PartialEq for WalletSignature {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for WalletSignature {}

impl std::fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletSignature(0x{}..)", hex::encode(&self.bytes[..4]))
    }
}

/// A wallet capable of signing EIP-712 typed data on demand.
///
/// Signing may suspend indefinitely while the user considers the prompt,
/// and may resolve to [`WalletError::Rejected`] if they decline. Both are
/// normal; callers must abort the surrounding operation cleanly without
/// losing state.
///
/// Implementations must be deterministic: the same account signing the
/// same typed data yields the same signature. The storage-key derivation
/// depends on this.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The account address this wallet signs for.
    fn address(&self) -> Address;

    /// Request a signature over the typed data's EIP-712 digest.
    async fn sign_typed_data(&self, typed: &TypedData) -> Result<WalletSignature>;
}

/// An in-process wallet holding a raw secp256k1 key.
///
/// Signs immediately with RFC 6979 deterministic ECDSA; never rejects.
pub struct LocalWallet {
    key: SigningKey,
    address: Address,
}

impl LocalWallet {
    /// Generate a wallet with a fresh random key.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Create from raw private-key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid secp256k1 scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(Self::from_signing_key(key))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let point = key.verifying_key().to_encoded_point(false);
        let address = Address::from_uncompressed_pubkey(point.as_bytes())
            .unwrap_or_else(|_| Address::from_bytes([0u8; 20]));
        Self { key, address }
    }

    /// Sign a 32-byte digest, returning a recoverable signature.
    ///
    /// # Errors
    ///
    /// Returns an error if ECDSA signing fails.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<WalletSignature> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        WalletSignature::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish()
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, typed: &TypedData) -> Result<WalletSignature> {
        self.sign_digest(&typed.signing_digest())
    }
}

/// Verify that `signature` over `typed` was produced by `expected`.
///
/// Verification needs only public data; in particular it does not require
/// the ability to decrypt anything the signature attests to.
pub fn verify_typed_data(typed: &TypedData, signature: &WalletSignature, expected: &Address) -> bool {
    match signature.recover(&typed.signing_digest()) {
        Ok(recovered) => recovered == *expected,
        Err(_) => false,
    }
}
