//! Mail parties and composition variants.

use serde::{Deserialize, Serialize};

use chainmail_wallet::Address;

/// One party on a message: display name and mail address.
///
/// The local part of the address (before `@`) is either the account's
/// wallet address or its registered display name; both resolve to the
/// same mailbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    /// Display name; may be empty.
    pub name: String,
    /// Full mail address, e.g. `0xabc...@chainmail.xyz`.
    pub address: String,
}

impl MailAddress {
    /// Create a mail address.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The `Name <address>` string that goes into the signed digest.
    pub fn display(&self) -> String {
        format!("{} <{}>", self.name, self.address)
    }

    /// The lowercased local part before `@`.
    pub fn local_part(&self) -> String {
        self.address
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// The facets a reading account can be addressed by.
///
/// Address-list matching is case-insensitive on the local part and
/// accepts either the raw account address or the registered display name
/// (the original system's ENS-style names).
#[derive(Clone, Debug)]
pub struct ReaderIdentity {
    /// Lowercased account address (`0x`-prefixed hex).
    pub account: String,
    /// Lowercased registered display name, if any.
    pub display_name: Option<String>,
}

impl ReaderIdentity {
    /// Build from a wallet address and optional display name.
    pub fn new(account: &Address, display_name: Option<&str>) -> Self {
        Self {
            account: account.to_hex(),
            display_name: display_name.map(str::to_lowercase),
        }
    }

    /// Whether `addr` refers to this reader.
    pub fn matches(&self, addr: &MailAddress) -> bool {
        let local = addr.local_part();
        if local.is_empty() {
            return false;
        }
        local == self.account || Some(&local) == self.display_name.as_ref()
    }
}

/// How a message came to be composed.
///
/// A tagged variant instead of optional-field sniffing: a reply always
/// knows what it replies to, a forward always knows its source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposeKind {
    /// A fresh message.
    New,
    /// A reply to an existing message.
    Reply {
        /// Message id being replied to.
        in_reply_to: String,
        /// Thread references, oldest first.
        references: Vec<String>,
    },
    /// A forward of an existing message.
    Forward {
        /// Message id of the forwarded source.
        source: String,
    },
}

/// Prefix a subject for a reply. Idempotent.
pub fn reply_subject(subject: &str) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Prefix a subject for a forward. Idempotent.
pub fn forward_subject(subject: &str) -> String {
    let lower = subject.to_lowercase();
    if lower.starts_with("fwd:") || lower.starts_with("fw:") {
        subject.to_string()
    } else {
        format!("Fwd: {subject}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainmail_wallet::LocalWallet;
    use chainmail_wallet::WalletSigner as _;

    #[test]
    fn test_display_string() {
        let addr = MailAddress::new("alice", "alice@chainmail.xyz");
        assert_eq!(addr.display(), "alice <alice@chainmail.xyz>");
    }

    #[test]
    fn test_local_part_is_lowercased() {
        let addr = MailAddress::new("", "0xABCD@chainmail.xyz");
        assert_eq!(addr.local_part(), "0xabcd");
    }

    #[test]
    fn test_reader_matches_account_case_insensitive() {
        let wallet = LocalWallet::generate();
        let reader = ReaderIdentity::new(&wallet.address(), None);

        let upper = wallet.address().to_hex().to_uppercase().replace("0X", "0x");
        let addr = MailAddress::new("", format!("{upper}@chainmail.xyz"));
        assert!(reader.matches(&addr));
    }

    #[test]
    fn test_reader_matches_display_name() {
        let wallet = LocalWallet::generate();
        let reader = ReaderIdentity::new(&wallet.address(), Some("Alice"));

        let addr = MailAddress::new("", "alice@chainmail.xyz");
        assert!(reader.matches(&addr));
    }

    #[test]
    fn test_reader_rejects_other_party() {
        let wallet = LocalWallet::generate();
        let reader = ReaderIdentity::new(&wallet.address(), None);

        let addr = MailAddress::new("", "bob@chainmail.xyz");
        assert!(!reader.matches(&addr));
    }

    #[test]
    fn test_reply_subject_idempotent() {
        assert_eq!(reply_subject("hello"), "Re: hello");
        assert_eq!(reply_subject("Re: hello"), "Re: hello");
        assert_eq!(reply_subject("RE: hello"), "RE: hello");
    }

    #[test]
    fn test_forward_subject_idempotent() {
        assert_eq!(forward_subject("hello"), "Fwd: hello");
        assert_eq!(forward_subject("Fwd: hello"), "Fwd: hello");
        assert_eq!(forward_subject("FW: hello"), "FW: hello");
    }
}
