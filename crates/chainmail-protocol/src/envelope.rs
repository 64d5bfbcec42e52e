//! Wrapped-key envelope assembly and disassembly.
//!
//! The positional correlation between the address list
//! `[from, ...to, ...cc, ...bcc]` and the wrapped-key list is the sole
//! mechanism by which a reader finds its own wrapped key; it has no
//! redundancy. Every index computation therefore goes through one
//! function, [`party_index`], and nothing else.
//!
//! Unwrapping always runs against the **sender's** public key (index 0 of
//! the envelope's key list), never the reader's own, because every wrap
//! was performed with the sender's private key.

use serde::{Deserialize, Serialize};

use chainmail_crypto::{symmetric, EncryptedData, X25519PrivateKey, X25519PublicKey};

use crate::content_key::ContentKey;
use crate::message::{MailAddress, ReaderIdentity};
use crate::{ProtocolError, Result};

/// Domain separation for deriving the wrap key from a shared secret.
const WRAP_KEY_CONTEXT: &str = "ChainMail content key wrap v1";

/// A content key wrapped for one party.
///
/// Hex encoding of the wrap cipher's `nonce || ciphertext` wire form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(String);

impl WrappedKey {
    /// Wrap from an existing hex string (e.g. fetched from transport).
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    /// The hex wire form.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// Encrypt a content key for one party.
///
/// The wrap key is derived from the X25519 shared secret between the
/// sender's private key and the party's public key; a fresh random nonce
/// is drawn per wrap, so re-wrapping the same key for the same pair
/// yields different (all valid) ciphertexts.
///
/// # Errors
///
/// Returns an error if the AEAD fails.
pub fn wrap_key(
    content_key: &ContentKey,
    sender_private: &X25519PrivateKey,
    party_public: &X25519PublicKey,
) -> Result<WrappedKey> {
    let shared = sender_private.diffie_hellman(party_public);
    let key = shared.derive_key(WRAP_KEY_CONTEXT);
    let encrypted = symmetric::encrypt(&key, content_key.expose().as_bytes())?;
    Ok(WrappedKey(encrypted.to_hex()))
}

/// Decrypt a wrapped content key.
///
/// `sender_public` must be the wrapping party's public key - for a
/// received message, the envelope's index 0.
///
/// # Errors
///
/// Returns [`ProtocolError::UnwrapFailed`] if the wrong key pair is used
/// or the wrap was tampered with; the authentication tag rejects before
/// any key material is produced.
pub fn unwrap_key(
    wrapped: &WrappedKey,
    my_private: &X25519PrivateKey,
    sender_public: &X25519PublicKey,
) -> Result<ContentKey> {
    let shared = my_private.diffie_hellman(sender_public);
    let key = shared.derive_key(WRAP_KEY_CONTEXT);

    let encrypted = EncryptedData::from_hex(wrapped.as_hex())
        .map_err(|_| ProtocolError::UnwrapFailed)?;
    let plaintext =
        symmetric::decrypt(&key, &encrypted).map_err(|_| ProtocolError::UnwrapFailed)?;
    let text = String::from_utf8(plaintext).map_err(|_| ProtocolError::UnwrapFailed)?;
    Ok(ContentKey::from_string(text))
}

/// The per-party wrapped keys attached to an encryptable message.
///
/// Invariant: both lists have length `1 + |to| + |cc| + |bcc|`, sharing
/// the address list's index space, and index 0 is the sender.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedKeyEnvelope {
    /// `encrypted_keys[i]` is the content key wrapped for party `i`.
    pub encrypted_keys: Vec<WrappedKey>,
    /// `public_keys[i]` is party `i`'s key-agreement public key;
    /// `public_keys[0]` (the sender's) is what every reader unwraps
    /// against.
    pub public_keys: Vec<X25519PublicKey>,
}

/// How the content key travels with a message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDelivery {
    /// Fully encryptable: one wrap per party.
    Encrypted(WrappedKeyEnvelope),
    /// Degraded mode: some recipient had no registered public key, so the
    /// content key travels in the clear.
    Plaintext(ContentKey),
}

impl KeyDelivery {
    /// Whether this is the degraded plaintext mode.
    pub fn is_plaintext(&self) -> bool {
        matches!(self, Self::Plaintext(_))
    }
}

/// Build the ordered address list `[from, ...to, ...cc, ...bcc]`.
pub fn address_list(
    from: &MailAddress,
    to: &[MailAddress],
    cc: &[MailAddress],
    bcc: &[MailAddress],
) -> Vec<MailAddress> {
    let mut list = Vec::with_capacity(1 + to.len() + cc.len() + bcc.len());
    list.push(from.clone());
    list.extend_from_slice(to);
    list.extend_from_slice(cc);
    list.extend_from_slice(bcc);
    list
}

/// Find the reader's position in the address list.
///
/// This is the single place the positional correlation is computed. The
/// sender occupies index 0; recipients follow in `to`, `cc`, `bcc` order.
/// Returns `None` when the reader is not a party to the message.
pub fn party_index(
    reader: &ReaderIdentity,
    from: &MailAddress,
    to: &[MailAddress],
    cc: &[MailAddress],
    bcc: &[MailAddress],
) -> Option<usize> {
    std::iter::once(from)
        .chain(to.iter())
        .chain(cc.iter())
        .chain(bcc.iter())
        .position(|addr| reader.matches(addr))
}

/// Assemble the key delivery for a message (send path).
///
/// `recipient_keys` holds one entry per recipient in address-list order
/// (`to`, then `cc`, then `bcc`); `None` marks a recipient with no
/// registered public key.
///
/// If every recipient has a key, wraps the content key for
/// `[sender, ...recipients]` - including the sender's own slot, so sent
/// mail and drafts stay readable to their author. If any key is missing
/// (or there are no recipients at all), the message is not encryptable
/// end-to-end and the content key is delivered in the clear instead.
///
/// All-or-nothing: either a complete envelope covering every party or
/// the plaintext fallback. A partial envelope is never produced.
///
/// # Errors
///
/// Returns an error only on AEAD failure; missing recipient keys are the
/// degraded mode, not an error.
pub fn assemble(
    content_key: &ContentKey,
    sender_private: &X25519PrivateKey,
    recipient_keys: &[Option<X25519PublicKey>],
) -> Result<KeyDelivery> {
    let encryptable =
        !recipient_keys.is_empty() && recipient_keys.iter().all(Option::is_some);
    if !encryptable {
        return Ok(KeyDelivery::Plaintext(content_key.clone()));
    }

    let mut public_keys = Vec::with_capacity(1 + recipient_keys.len());
    public_keys.push(sender_private.public_key());
    public_keys.extend(recipient_keys.iter().flatten().cloned());

    let mut encrypted_keys = Vec::with_capacity(public_keys.len());
    for public in &public_keys {
        encrypted_keys.push(wrap_key(content_key, sender_private, public)?);
    }

    Ok(KeyDelivery::Encrypted(WrappedKeyEnvelope {
        encrypted_keys,
        public_keys,
    }))
}

/// Recover the content key from a received message (read path).
///
/// # Errors
///
/// - [`ProtocolError::KeyNotFound`] if the reader is not a party, or the
///   matched position has no wrapped key.
/// - [`ProtocolError::MalformedEnvelope`] if the envelope's structural
///   invariants are violated.
/// - [`ProtocolError::UnwrapFailed`] if the wrap does not authenticate.
pub fn disassemble(
    delivery: &KeyDelivery,
    reader: &ReaderIdentity,
    from: &MailAddress,
    to: &[MailAddress],
    cc: &[MailAddress],
    bcc: &[MailAddress],
    my_private: &X25519PrivateKey,
) -> Result<ContentKey> {
    let envelope = match delivery {
        KeyDelivery::Plaintext(key) => return Ok(key.clone()),
        KeyDelivery::Encrypted(envelope) => envelope,
    };

    if envelope.encrypted_keys.len() != envelope.public_keys.len() {
        return Err(ProtocolError::MalformedEnvelope(format!(
            "{} wrapped keys but {} public keys",
            envelope.encrypted_keys.len(),
            envelope.public_keys.len()
        )));
    }
    let sender_public = envelope
        .public_keys
        .first()
        .ok_or_else(|| ProtocolError::MalformedEnvelope("empty key lists".into()))?;

    let index =
        party_index(reader, from, to, cc, bcc).ok_or(ProtocolError::KeyNotFound)?;
    let wrapped = envelope
        .encrypted_keys
        .get(index)
        .ok_or(ProtocolError::KeyNotFound)?;

    unwrap_key(wrapped, my_private, sender_public)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainmail_wallet::LocalWallet;
    use chainmail_wallet::WalletSigner as _;

    struct Party {
        wallet: LocalWallet,
        private: X25519PrivateKey,
        mail: MailAddress,
    }

    impl Party {
        fn new(name: &str) -> Self {
            let wallet = LocalWallet::generate();
            let private = X25519PrivateKey::generate();
            let mail = MailAddress::new(
                name,
                format!("{}@chainmail.xyz", wallet.address().to_hex()),
            );
            Self {
                wallet,
                private,
                mail,
            }
        }

        fn reader(&self) -> ReaderIdentity {
            ReaderIdentity::new(&self.wallet.address(), None)
        }

        fn public(&self) -> X25519PublicKey {
            self.private.public_key()
        }
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let sender = Party::new("sender");
        let recipient = Party::new("recipient");
        let key = ContentKey::generate("0xsender");

        let wrapped = wrap_key(&key, &sender.private, &recipient.public()).unwrap();
        let unwrapped = unwrap_key(&wrapped, &recipient.private, &sender.public()).unwrap();

        assert_eq!(key, unwrapped);
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let sender = Party::new("sender");
        let recipient = Party::new("recipient");
        let outsider = Party::new("outsider");
        let key = ContentKey::generate("0xsender");

        let wrapped = wrap_key(&key, &sender.private, &recipient.public()).unwrap();
        let result = unwrap_key(&wrapped, &outsider.private, &sender.public());

        assert!(matches!(result, Err(ProtocolError::UnwrapFailed)));
    }

    #[test]
    fn test_unwrap_tampered_wrap_fails() {
        let sender = Party::new("sender");
        let recipient = Party::new("recipient");
        let key = ContentKey::generate("0xsender");

        let wrapped = wrap_key(&key, &sender.private, &recipient.public()).unwrap();
        let mut bytes = hex::decode(wrapped.as_hex()).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x01;
        let tampered = WrappedKey::from_hex(hex::encode(bytes));

        let result = unwrap_key(&tampered, &recipient.private, &sender.public());
        assert!(matches!(result, Err(ProtocolError::UnwrapFailed)));
    }

    #[test]
    fn test_rewrap_differs_but_both_unwrap() {
        // Fresh nonce per wrap: same inputs, different ciphertexts, both
        // valid.
        let sender = Party::new("sender");
        let recipient = Party::new("recipient");
        let key = ContentKey::generate("0xsender");

        let first = wrap_key(&key, &sender.private, &recipient.public()).unwrap();
        let second = wrap_key(&key, &sender.private, &recipient.public()).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            unwrap_key(&first, &recipient.private, &sender.public()).unwrap(),
            unwrap_key(&second, &recipient.private, &sender.public()).unwrap(),
        );
    }

    #[test]
    fn test_assemble_wraps_sender_first() {
        let sender = Party::new("sender");
        let to = Party::new("to");
        let key = ContentKey::generate("0xsender");

        let delivery = assemble(&key, &sender.private, &[Some(to.public())]).unwrap();
        let KeyDelivery::Encrypted(envelope) = delivery else {
            panic!("expected encrypted delivery");
        };

        assert_eq!(envelope.encrypted_keys.len(), 2);
        assert_eq!(envelope.public_keys.len(), 2);
        assert_eq!(envelope.public_keys[0], sender.public());
        assert_eq!(envelope.public_keys[1], to.public());
    }

    #[test]
    fn test_assemble_missing_recipient_key_degrades() {
        let sender = Party::new("sender");
        let to = Party::new("to");
        let key = ContentKey::generate("0xsender");

        let delivery =
            assemble(&key, &sender.private, &[Some(to.public()), None]).unwrap();

        match delivery {
            KeyDelivery::Plaintext(plain) => assert_eq!(plain, key),
            KeyDelivery::Encrypted(_) => panic!("expected plaintext fallback"),
        }
    }

    #[test]
    fn test_assemble_no_recipients_degrades() {
        let sender = Party::new("sender");
        let key = ContentKey::generate("0xsender");

        let delivery = assemble(&key, &sender.private, &[]).unwrap();
        assert!(delivery.is_plaintext());
    }

    /// Exhaustive check of the positional correlation: for every
    /// combination of present/absent cc and bcc, every party's computed
    /// index recovers exactly its own slot.
    #[test]
    fn test_party_index_every_cc_bcc_combination() {
        let sender = Party::new("sender");
        let to_parties = vec![Party::new("to1"), Party::new("to2")];

        for cc_count in 0..=2 {
            for bcc_count in 0..=2 {
                let cc_parties: Vec<Party> =
                    (0..cc_count).map(|i| Party::new(&format!("cc{i}"))).collect();
                let bcc_parties: Vec<Party> =
                    (0..bcc_count).map(|i| Party::new(&format!("bcc{i}"))).collect();

                let to: Vec<MailAddress> =
                    to_parties.iter().map(|p| p.mail.clone()).collect();
                let cc: Vec<MailAddress> =
                    cc_parties.iter().map(|p| p.mail.clone()).collect();
                let bcc: Vec<MailAddress> =
                    bcc_parties.iter().map(|p| p.mail.clone()).collect();

                let list = address_list(&sender.mail, &to, &cc, &bcc);
                assert_eq!(list.len(), 1 + to.len() + cc.len() + bcc.len());

                let everyone: Vec<&Party> = std::iter::once(&sender)
                    .chain(to_parties.iter())
                    .chain(cc_parties.iter())
                    .chain(bcc_parties.iter())
                    .collect();

                for (expected, party) in everyone.iter().enumerate() {
                    let index =
                        party_index(&party.reader(), &sender.mail, &to, &cc, &bcc);
                    assert_eq!(
                        index,
                        Some(expected),
                        "cc={cc_count} bcc={bcc_count} party={expected}"
                    );
                }

                let stranger = Party::new("stranger");
                assert_eq!(
                    party_index(&stranger.reader(), &sender.mail, &to, &cc, &bcc),
                    None
                );
            }
        }
    }

    #[test]
    fn test_full_assembly_every_party_recovers_the_key() {
        let sender = Party::new("sender");
        let to_parties = vec![Party::new("to1"), Party::new("to2")];
        let cc_parties = vec![Party::new("cc1")];
        let bcc_parties = vec![Party::new("bcc1")];
        let key = ContentKey::generate("0xsender");

        let recipient_keys: Vec<Option<X25519PublicKey>> = to_parties
            .iter()
            .chain(cc_parties.iter())
            .chain(bcc_parties.iter())
            .map(|p| Some(p.public()))
            .collect();
        let delivery = assemble(&key, &sender.private, &recipient_keys).unwrap();

        let to: Vec<MailAddress> = to_parties.iter().map(|p| p.mail.clone()).collect();
        let cc: Vec<MailAddress> = cc_parties.iter().map(|p| p.mail.clone()).collect();
        let bcc: Vec<MailAddress> = bcc_parties.iter().map(|p| p.mail.clone()).collect();

        // Every recipient, and the sender reopening their own message.
        let everyone: Vec<&Party> = std::iter::once(&sender)
            .chain(to_parties.iter())
            .chain(cc_parties.iter())
            .chain(bcc_parties.iter())
            .collect();

        for party in everyone {
            let recovered = disassemble(
                &delivery,
                &party.reader(),
                &sender.mail,
                &to,
                &cc,
                &bcc,
                &party.private,
            )
            .unwrap();
            assert_eq!(recovered, key);
        }
    }

    #[test]
    fn test_disassemble_stranger_gets_key_not_found() {
        let sender = Party::new("sender");
        let to = Party::new("to");
        let stranger = Party::new("stranger");
        let key = ContentKey::generate("0xsender");

        let delivery = assemble(&key, &sender.private, &[Some(to.public())]).unwrap();
        let result = disassemble(
            &delivery,
            &stranger.reader(),
            &sender.mail,
            &[to.mail.clone()],
            &[],
            &[],
            &stranger.private,
        );

        assert!(matches!(result, Err(ProtocolError::KeyNotFound)));
    }

    #[test]
    fn test_disassemble_plaintext_mode_bypasses_unwrap() {
        let sender = Party::new("sender");
        let to = Party::new("to");
        let key = ContentKey::generate("0xsender");

        let delivery = KeyDelivery::Plaintext(key.clone());
        let recovered = disassemble(
            &delivery,
            &to.reader(),
            &sender.mail,
            &[to.mail.clone()],
            &[],
            &[],
            &to.private,
        )
        .unwrap();

        assert_eq!(recovered, key);
    }

    #[test]
    fn test_disassemble_rejects_length_mismatch() {
        let sender = Party::new("sender");
        let to = Party::new("to");
        let key = ContentKey::generate("0xsender");

        let delivery = assemble(&key, &sender.private, &[Some(to.public())]).unwrap();
        let KeyDelivery::Encrypted(mut envelope) = delivery else {
            panic!("expected encrypted delivery");
        };
        envelope.public_keys.pop();

        let result = disassemble(
            &KeyDelivery::Encrypted(envelope),
            &to.reader(),
            &sender.mail,
            &[to.mail.clone()],
            &[],
            &[],
            &to.private,
        );
        assert!(matches!(result, Err(ProtocolError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_disassemble_party_beyond_key_list_gets_key_not_found() {
        // A bcc party whose slot was never wrapped (e.g. a sender that only
        // wrapped for to+cc) must get KeyNotFound, not a panic.
        let sender = Party::new("sender");
        let to = Party::new("to");
        let bcc = Party::new("bcc");
        let key = ContentKey::generate("0xsender");

        let delivery = assemble(&key, &sender.private, &[Some(to.public())]).unwrap();
        let result = disassemble(
            &delivery,
            &bcc.reader(),
            &sender.mail,
            &[to.mail.clone()],
            &[],
            &[bcc.mail.clone()],
            &bcc.private,
        );
        assert!(matches!(result, Err(ProtocolError::KeyNotFound)));
    }
}
