//! Bare SHA-1 hex digests left over from the oldest accounts.

use sha1::{Digest, Sha1};
use std::fmt;

use super::{constant_time_eq, HashError};

const DIGEST_HEX_LEN: usize = 40;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LegacyDigest<'a>(&'a str);

impl<'a> LegacyDigest<'a> {
    /// Accept exactly 40 lowercase hex characters.
    ///
    /// # Errors
    /// Returns [`HashError::UnknownFormat`] for anything else, uppercase hex included.
    pub fn parse(stored: &'a str) -> Result<Self, HashError> {
        let is_lower_hex = stored
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));

        if stored.len() == DIGEST_HEX_LEN && is_lower_hex {
            Ok(Self(stored))
        } else {
            Err(HashError::UnknownFormat)
        }
    }

    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let computed = sha1_hex(candidate);
        constant_time_eq(computed.as_bytes(), self.0.as_bytes())
    }
}

impl fmt::Debug for LegacyDigest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LegacyDigest(***)")
    }
}

fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}
