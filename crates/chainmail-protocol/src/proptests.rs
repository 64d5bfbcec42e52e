//! Property-based tests for the envelope protocol.
//!
//! These pin the invariants the read path depends on: wrap/unwrap is a
//! true inverse for any key pair, the positional correlation recovers
//! every party's slot exactly, and tampering is always rejected.

use proptest::prelude::*;

use chainmail_crypto::X25519PrivateKey;

use crate::content_key::ContentKey;
use crate::envelope::{
    address_list, assemble, disassemble, party_index, unwrap_key, wrap_key, KeyDelivery,
    WrappedKey,
};
use crate::message::{MailAddress, ReaderIdentity};

fn party(tag: &str, index: usize) -> (X25519PrivateKey, MailAddress, ReaderIdentity) {
    let private = X25519PrivateKey::generate();
    let account = format!("0x{tag}{index:038x}");
    let mail = MailAddress::new("", format!("{account}@chainmail.xyz"));
    let reader = ReaderIdentity {
        account,
        display_name: None,
    };
    (private, mail, reader)
}

proptest! {
    /// unwrap(wrap(k)) == k for arbitrary key pairs.
    #[test]
    fn wrap_unwrap_inverse(seed in any::<[u8; 32]>()) {
        let sender = X25519PrivateKey::from_bytes(&seed).unwrap();
        let recipient = X25519PrivateKey::generate();
        let key = ContentKey::generate("0xsender");

        let wrapped = wrap_key(&key, &sender, &recipient.public_key()).unwrap();
        let unwrapped =
            unwrap_key(&wrapped, &recipient, &sender.public_key()).unwrap();
        prop_assert_eq!(key, unwrapped);
    }

    /// Re-wrapping yields valid-but-different ciphertext every time.
    #[test]
    fn rewrap_fresh_nonce(_seed in any::<u64>()) {
        let sender = X25519PrivateKey::generate();
        let recipient = X25519PrivateKey::generate();
        let key = ContentKey::generate("0xsender");

        let a = wrap_key(&key, &sender, &recipient.public_key()).unwrap();
        let b = wrap_key(&key, &sender, &recipient.public_key()).unwrap();
        prop_assert_ne!(a.as_hex(), b.as_hex());
    }

    /// Flipping any byte of a wrapped key makes unwrap fail; never silent
    /// corruption.
    #[test]
    fn tampered_wrap_rejected(flip in any::<prop::sample::Index>()) {
        let sender = X25519PrivateKey::generate();
        let recipient = X25519PrivateKey::generate();
        let key = ContentKey::generate("0xsender");

        let wrapped = wrap_key(&key, &sender, &recipient.public_key()).unwrap();
        let mut bytes = hex::decode(wrapped.as_hex()).unwrap();
        let pos = flip.index(bytes.len());
        bytes[pos] ^= 0x01;
        let tampered = WrappedKey::from_hex(hex::encode(bytes));

        prop_assert!(unwrap_key(&tampered, &recipient, &sender.public_key()).is_err());
    }

    /// For any recipient-list shape, the address list is 1 + |to| + |cc| +
    /// |bcc| long and every party's index recovers exactly its own slot.
    #[test]
    fn positional_correlation_exact(
        to_count in 1usize..4,
        cc_count in 0usize..3,
        bcc_count in 0usize..3,
    ) {
        let (sender_private, sender_mail, sender_reader) = party("aa", 0);
        let to: Vec<_> = (0..to_count).map(|i| party("bb", i)).collect();
        let cc: Vec<_> = (0..cc_count).map(|i| party("cc", i)).collect();
        let bcc: Vec<_> = (0..bcc_count).map(|i| party("dd", i)).collect();

        let to_mails: Vec<MailAddress> = to.iter().map(|p| p.1.clone()).collect();
        let cc_mails: Vec<MailAddress> = cc.iter().map(|p| p.1.clone()).collect();
        let bcc_mails: Vec<MailAddress> = bcc.iter().map(|p| p.1.clone()).collect();

        let list = address_list(&sender_mail, &to_mails, &cc_mails, &bcc_mails);
        prop_assert_eq!(list.len(), 1 + to_count + cc_count + bcc_count);

        let key = ContentKey::generate("0xsender");
        let recipient_keys: Vec<_> = to
            .iter()
            .chain(cc.iter())
            .chain(bcc.iter())
            .map(|p| Some(p.0.public_key()))
            .collect();
        let delivery = assemble(&key, &sender_private, &recipient_keys).unwrap();

        let everyone: Vec<(&X25519PrivateKey, &ReaderIdentity)> =
            std::iter::once((&sender_private, &sender_reader))
                .chain(to.iter().map(|p| (&p.0, &p.2)))
                .chain(cc.iter().map(|p| (&p.0, &p.2)))
                .chain(bcc.iter().map(|p| (&p.0, &p.2)))
                .collect();

        for (expected, (private, reader)) in everyone.into_iter().enumerate() {
            let index =
                party_index(reader, &sender_mail, &to_mails, &cc_mails, &bcc_mails);
            prop_assert_eq!(index, Some(expected));

            let recovered = disassemble(
                &delivery,
                reader,
                &sender_mail,
                &to_mails,
                &cc_mails,
                &bcc_mails,
                private,
            )
            .unwrap();
            prop_assert_eq!(&recovered, &key);
        }
    }

    /// Any missing recipient key degrades the whole message, never a
    /// partial envelope.
    #[test]
    fn missing_key_always_degrades(
        present in prop::collection::vec(any::<bool>(), 1..6),
    ) {
        prop_assume!(present.iter().any(|p| !p));

        let sender = X25519PrivateKey::generate();
        let key = ContentKey::generate("0xsender");
        let recipient_keys: Vec<_> = present
            .iter()
            .map(|&p| p.then(|| X25519PrivateKey::generate().public_key()))
            .collect();

        let delivery = assemble(&key, &sender, &recipient_keys).unwrap();
        prop_assert!(matches!(delivery, KeyDelivery::Plaintext(_)));
    }
}
