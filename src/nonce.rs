//! Nonce derivation from shared secret codes.

use md5::{Digest, Md5};

/// First character of the marked nonce variant.
pub const NONCE_MARKER: char = 'r';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceVariant {
    /// The MD5 hex digest of the secret, unmodified
    Raw,
    /// The digest with its first character replaced by [`NONCE_MARKER`]
    Marked,
}

impl NonceVariant {
    /// Label used in the audit diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            NonceVariant::Raw => "_nonce1",
            NonceVariant::Marked => "_nonce2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub variant: NonceVariant,
    pub value: String,
}

/// Lowercase hex MD5 of the secret code.
pub fn nonce_digest(secret: &str) -> String {
    hex::encode(Md5::digest(secret.as_bytes()))
}

/// Both variants for one secret, raw first.
pub fn derive_nonces(secret: &str) -> [Nonce; 2] {
    let raw = nonce_digest(secret);
    let mut marked = String::with_capacity(raw.len());
    marked.push(NONCE_MARKER);
    marked.push_str(&raw[1..]);
    [
        Nonce {
            variant: NonceVariant::Raw,
            value: raw,
        },
        Nonce {
            variant: NonceVariant::Marked,
            value: marked,
        },
    ]
}
