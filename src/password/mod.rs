//! Verification of passwords stored by the legacy account database.
//!
//! Two stored formats are recognized:
//!
//! - **Structured**: `PBKDF2$sha256$<iterations>$<salt>$<base64 key>`. The salt
//!   field is itself a base64 string, but the legacy writer fed that ASCII
//!   string (not the decoded bytes) into PBKDF2, so it is used verbatim here.
//!   The derived key is 24 bytes of PBKDF2-HMAC-SHA256, stored base64 encoded.
//! - **Legacy**: 40 lowercase hex characters, a plain SHA-1 of the password.
//!
//! Everything else is rejected. Verification never panics and never errors
//! towards the caller: a stored value that cannot be parsed simply does not
//! match. Stored hashes are borrowed, never re-encoded or rewritten.

mod legacy;
mod structured;

pub use self::legacy::LegacyDigest;
pub use self::structured::{Pbkdf2Hash, MAX_ITERATIONS};

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Reasons a stored hash is rejected before any derivation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("stored hash is empty")]
    Empty,
    #[error("unrecognized stored hash format")]
    UnknownFormat,
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    #[error("unsupported digest")]
    UnsupportedDigest,
    #[error("invalid iteration count")]
    InvalidIterations,
    #[error("missing salt")]
    MissingSalt,
    #[error("missing derived key")]
    MissingKey,
}

/// A parsed, borrowed view over a stored password hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredHash<'a> {
    Pbkdf2(Pbkdf2Hash<'a>),
    Legacy(LegacyDigest<'a>),
}

impl<'a> StoredHash<'a> {
    /// Detect the format of `stored` and parse its parameters.
    ///
    /// # Errors
    /// Returns a [`HashError`] when the value matches neither format.
    pub fn parse(stored: &'a str) -> Result<Self, HashError> {
        if stored.is_empty() {
            return Err(HashError::Empty);
        }

        if stored.starts_with(structured::PREFIX) {
            return Pbkdf2Hash::parse(stored).map(Self::Pbkdf2);
        }

        LegacyDigest::parse(stored).map(Self::Legacy)
    }

    /// Check `candidate` against this hash.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        match self {
            Self::Pbkdf2(hash) => hash.verify(candidate),
            Self::Legacy(digest) => digest.verify(candidate),
        }
    }

    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Pbkdf2(_) => "pbkdf2-sha256",
            Self::Legacy(_) => "sha1",
        }
    }
}

/// Returns `true` only when `candidate` matches `stored`.
///
/// Malformed or unrecognized stored values return `false`.
#[must_use]
pub fn verify(candidate: &str, stored: &str) -> bool {
    StoredHash::parse(stored).is_ok_and(|hash| hash.verify(candidate))
}

/// Compare two byte strings without short-circuiting on the first mismatch.
///
/// Only the lengths may leak through timing.
pub(crate) fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.ct_eq(right).into()
}
