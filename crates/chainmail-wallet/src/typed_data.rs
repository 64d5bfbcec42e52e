//! EIP-712 typed-data encoding.
//!
//! ChainMail signs three structured payloads with the user's wallet: the
//! salt signature that derives the storage key (`Sign_Salt`), the key
//! bundle attestation (`Sign_KeyData`), and the mail metadata signature
//! (`Sign_Mail`). All three use only `string` and `string[]` fields, so
//! this module implements exactly that subset of EIP-712: type hashes,
//! per-field hashing, the domain separator, and the final
//! `\x19\x01 || domainSeparator || structHash` digest.
//!
//! The typed-data scheme is what domain-separates ChainMail signatures
//! from any other protocol a wallet might sign for, and the schema name
//! binds each signature to its purpose.

use sha3::{Digest, Keccak256};

/// EIP-712 signing domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712Domain {
    /// Human-readable application name.
    pub name: String,
    /// Schema version; bumping it invalidates old signatures.
    pub version: String,
}

impl Eip712Domain {
    /// Create a domain.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// The ChainMail application domain.
    pub fn chainmail() -> Self {
        Self::new("ChainMail", "1.0.0")
    }

    /// Compute the EIP-712 domain separator.
    pub fn separator(&self) -> [u8; 32] {
        let type_hash = keccak256(b"EIP712Domain(string name,string version)");
        let mut hasher = Keccak256::new();
        hasher.update(type_hash);
        hasher.update(keccak256(self.name.as_bytes()));
        hasher.update(keccak256(self.version.as_bytes()));
        hasher.finalize().into()
    }
}

/// A field value in a typed-data struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// A `string` field.
    Str(String),
    /// A `string[]` field.
    StrArray(Vec<String>),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::StrArray(_) => "string[]",
        }
    }

    /// EIP-712 value encoding: strings hash directly, arrays hash the
    /// concatenation of their members' hashes.
    fn encode(&self) -> [u8; 32] {
        match self {
            Self::Str(s) => keccak256(s.as_bytes()),
            Self::StrArray(items) => {
                let mut hasher = Keccak256::new();
                for item in items {
                    hasher.update(keccak256(item.as_bytes()));
                }
                hasher.finalize().into()
            }
        }
    }
}

/// An ordered EIP-712 struct ready for signing.
///
/// Field order is significant: it defines both the encoded type string and
/// the data layout, so two builders pushing the same fields in the same
/// order always produce the same digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedData {
    domain: Eip712Domain,
    primary_type: String,
    fields: Vec<(String, FieldValue)>,
}

impl TypedData {
    /// Start a typed-data struct for the given primary type.
    pub fn new(domain: Eip712Domain, primary_type: impl Into<String>) -> Self {
        Self {
            domain,
            primary_type: primary_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a `string` field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), FieldValue::Str(value.into())));
        self
    }

    /// Append a `string[]` field.
    #[must_use]
    pub fn array_field(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.fields.push((name.into(), FieldValue::StrArray(values)));
        self
    }

    /// The primary type name.
    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    /// The encoded type string, e.g. `Sign_Salt(string hint,string salt)`.
    pub fn encode_type(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.primary_type);
        out.push('(');
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(value.type_name());
            out.push(' ');
            out.push_str(name);
        }
        out.push(')');
        out
    }

    /// The EIP-712 struct hash.
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(keccak256(self.encode_type().as_bytes()));
        for (_, value) in &self.fields {
            hasher.update(value.encode());
        }
        hasher.finalize().into()
    }

    /// The final signing digest: `keccak256(0x1901 || domain || struct)`.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(self.domain.separator());
        hasher.update(self.struct_hash());
        hasher.finalize().into()
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}
