//! At-rest protection of the identity private key.
//!
//! The private key is encrypted under a storage key derived from the
//! wallet's `Sign_Salt` signature over a random per-account salt. The salt
//! is public; the signature is reproducible only by the owning wallet, so
//! the server stores the wrapped key without ever being able to open it.
//!
//! The published bundle is itself attested with a `Sign_KeyData` signature
//! over a hash of the public key and the wrapped private key, so a server
//! that swaps either is detectable.

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use chainmail_crypto::{symmetric, EncryptedData, Hash256, SymmetricKey, X25519PublicKey};
use chainmail_wallet::{
    verify_typed_data, Address, Eip712Domain, TypedData, WalletSignature, WalletSigner,
};

use crate::{IdentityError, IdentityKeyPair, Result};

/// Size of the per-account salt in bytes.
pub const SALT_SIZE: usize = 32;

/// Hint string shown by the wallet alongside the salt prompt.
const SALT_HINT: &str = "Sign this salt to generate encryption key";

/// Domain separation for the storage key derivation.
const STORAGE_KEY_CONTEXT: &str = "ChainMail storage key v1";

/// Machine-readable descriptor of the key scheme, covered by `Sign_KeyData`.
const KEYS_META: &str =
    r#"{"scheme":"x25519","wrap":"xchacha20-poly1305","kdf":"blake3","encoding":"hex"}"#;

/// The per-account identity bundle persisted server-side.
///
/// `ciphertext` is only decryptable by re-deriving the storage key from a
/// fresh wallet signature over `salt`; the server never sees the plaintext
/// private key or the storage key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageWrappedPrivateKey {
    /// Random per-account salt, hex-encoded. Public.
    pub salt: String,
    /// The encrypted private key (`nonce || ciphertext`), hex-encoded.
    pub ciphertext: String,
    /// The account's published X25519 public key.
    pub public_key: X25519PublicKey,
    /// `Sign_KeyData` wallet signature attesting this bundle.
    pub signature: String,
    /// Key-scheme descriptor covered by the attestation.
    pub keys_meta: String,
    /// RFC 3339 timestamp of bundle creation, covered by the attestation.
    pub date: String,
}

fn sign_salt_typed_data(salt_hex: &str) -> TypedData {
    TypedData::new(Eip712Domain::chainmail(), "Sign_Salt")
        .field("hint", SALT_HINT)
        .field("salt", salt_hex)
}

fn sign_key_data_typed_data(date: &str, salt: &str, keys_hash: &str, keys_meta: &str) -> TypedData {
    TypedData::new(Eip712Domain::chainmail(), "Sign_KeyData")
        .field("date", date)
        .field("salt", salt)
        .field("keys_hash", keys_hash)
        .field("keys_meta", keys_meta)
}

/// Hash binding the public key and the wrapped private key together.
fn keys_hash(public_key: &X25519PublicKey, ciphertext_hex: &str) -> String {
    let public_key_hash = Hash256::hash(public_key.to_hex().as_bytes()).to_hex();
    let wrapped_key_hash = Hash256::hash(ciphertext_hex.as_bytes()).to_hex();
    Hash256::hash(format!("{public_key_hash}{wrapped_key_hash}").as_bytes()).to_hex()
}

/// Derive the storage key by having the wallet sign the salt.
///
/// Deterministic: the same wallet and salt always yield the same key.
async fn obtain_storage_key<W: WalletSigner + ?Sized>(
    wallet: &W,
    salt_hex: &str,
) -> Result<SymmetricKey> {
    let signature = wallet.sign_typed_data(&sign_salt_typed_data(salt_hex)).await?;
    Ok(SymmetricKey::from_array(blake3::derive_key(
        STORAGE_KEY_CONTEXT,
        signature.as_bytes(),
    )))
}

/// Protect a freshly generated identity keypair for server-side storage.
///
/// Generates the account salt, derives the storage key from the wallet's
/// salt signature, encrypts the private key, and signs the resulting
/// bundle with `Sign_KeyData`.
///
/// # Errors
///
/// Propagates wallet errors (including `Rejected`) and crypto failures.
/// Nothing is persisted by this function; on error no partial bundle
/// exists anywhere.
pub async fn protect_private_key<W: WalletSigner + ?Sized>(
    keypair: &IdentityKeyPair,
    wallet: &W,
) -> Result<StorageWrappedPrivateKey> {
    let mut salt_bytes = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let storage_key = obtain_storage_key(wallet, &salt).await?;
    let ciphertext =
        symmetric::encrypt(&storage_key, keypair.private_key().as_bytes())?.to_hex();

    let public_key = keypair.public_key().clone();
    let keys_hash = keys_hash(&public_key, &ciphertext);
    let date = Utc::now().to_rfc3339();

    let typed = sign_key_data_typed_data(&date, &salt, &keys_hash, KEYS_META);
    let signature = wallet.sign_typed_data(&typed).await?;

    Ok(StorageWrappedPrivateKey {
        salt,
        ciphertext,
        public_key,
        signature: signature.to_hex(),
        keys_meta: KEYS_META.to_string(),
        date,
    })
}

/// Recover the identity keypair from its wrapped form.
///
/// Re-signs the salt to re-derive the storage key and decrypts.
///
/// # Errors
///
/// - [`IdentityError::DecryptionFailed`] if the signature does not match
///   the one used at protection time (e.g. a different wallet account
///   signed). This is the earliest detectable point of a wrong wallet.
/// - [`IdentityError::InvalidBundle`] if decryption succeeds but the
///   derived public key does not match the published one.
pub async fn recover_private_key<W: WalletSigner + ?Sized>(
    wrapped: &StorageWrappedPrivateKey,
    wallet: &W,
) -> Result<IdentityKeyPair> {
    let storage_key = obtain_storage_key(wallet, &wrapped.salt).await?;
    let encrypted = EncryptedData::from_hex(&wrapped.ciphertext)?;

    let private_bytes = symmetric::decrypt(&storage_key, &encrypted)
        .map_err(|_| IdentityError::DecryptionFailed)?;

    let keypair = IdentityKeyPair::from_private_bytes(&private_bytes)?;
    if keypair.public_key() != &wrapped.public_key {
        return Err(IdentityError::InvalidBundle(
            "decrypted private key does not match published public key".into(),
        ));
    }
    Ok(keypair)
}

/// Verify the `Sign_KeyData` attestation on a stored bundle.
///
/// Recomputes the keys hash from the bundle's own public key and
/// ciphertext, so any substitution of either invalidates the signature.
pub fn verify_key_bundle(wrapped: &StorageWrappedPrivateKey, owner: &Address) -> bool {
    let Ok(signature) = WalletSignature::from_hex(&wrapped.signature) else {
        return false;
    };
    let keys_hash = keys_hash(&wrapped.public_key, &wrapped.ciphertext);
    let typed =
        sign_key_data_typed_data(&wrapped.date, &wrapped.salt, &keys_hash, &wrapped.keys_meta);
    verify_typed_data(&typed, &signature, owner)
}
