//! The account's key-agreement keypair.

use chainmail_crypto::{SharedSecret, X25519PrivateKey, X25519PublicKey};

use crate::Result;

/// An account's long-term X25519 identity keypair.
///
/// Generated exactly once per account, the first time no wrapped key
/// exists server-side. The public half is published; the private half
/// only ever exists in plaintext inside a [`crate::Session`].
pub struct IdentityKeyPair {
    private: X25519PrivateKey,
    public: X25519PublicKey,
}

impl IdentityKeyPair {
    /// Generate a fresh identity keypair.
    pub fn generate() -> Self {
        let private = X25519PrivateKey::generate();
        let public = private.public_key();
        Self { private, public }
    }

    /// Rebuild a keypair from decrypted private-key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid private key.
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        let private = X25519PrivateKey::from_bytes(bytes)?;
        let public = private.public_key();
        Ok(Self { private, public })
    }

    /// The published public key.
    pub fn public_key(&self) -> &X25519PublicKey {
        &self.public
    }

    /// Derive the shared secret with a peer's public key.
    pub fn shared_secret(&self, peer: &X25519PublicKey) -> SharedSecret {
        self.private.diffie_hellman(peer)
    }

    /// Borrow the private key for wrap/unwrap operations.
    pub fn private_key(&self) -> &X25519PrivateKey {
        &self.private
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_derives_matching_public() {
        let keypair = IdentityKeyPair::generate();
        let rebuilt = IdentityKeyPair::from_private_bytes(keypair.private.as_bytes()).unwrap();
        assert_eq!(keypair.public_key(), rebuilt.public_key());
    }

    #[test]
    fn test_shared_secret_agreement() {
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();

        let ab = alice.shared_secret(bob.public_key());
        let ba = bob.shared_secret(alice.public_key());
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_debug_hides_private_half() {
        let keypair = IdentityKeyPair::generate();
        let debug = format!("{:?}", keypair);
        assert!(!debug.contains(&hex::encode(keypair.private.as_bytes())));
    }
}
