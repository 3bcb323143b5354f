//! `PBKDF2$sha256$<iterations>$<salt>$<key>` hashes.

use base64ct::{Base64, Encoding};
use sha2::Sha256;
use std::fmt;

use super::{constant_time_eq, HashError};

pub(super) const PREFIX: &str = "PBKDF2$";

const TAG: &str = "PBKDF2";
const DIGEST: &str = "sha256";
const KEY_LENGTH: usize = 24;

/// Upper bound on accepted iteration counts, keeps a corrupt row from pinning a CPU.
pub const MAX_ITERATIONS: u32 = 10_000_000;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Hash<'a> {
    iterations: u32,
    salt: &'a str,
    key: &'a str,
}

impl<'a> Pbkdf2Hash<'a> {
    /// Split and validate the five `$`-separated fields.
    ///
    /// # Errors
    /// Returns a [`HashError`] describing the first invalid field.
    pub fn parse(stored: &'a str) -> Result<Self, HashError> {
        let fields: Vec<&str> = stored.split('$').collect();
        let [tag, digest, iterations, salt, key] = *fields.as_slice() else {
            return Err(HashError::FieldCount(fields.len()));
        };

        if tag != TAG {
            return Err(HashError::UnknownFormat);
        }
        // Stricter than the legacy reader, which ignored this field and always used SHA-256.
        if digest != DIGEST {
            return Err(HashError::UnsupportedDigest);
        }
        let iterations = parse_iterations(iterations)?;
        if salt.is_empty() {
            return Err(HashError::MissingSalt);
        }
        if key.is_empty() {
            return Err(HashError::MissingKey);
        }

        Ok(Self {
            iterations,
            salt,
            key,
        })
    }

    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The salt exactly as stored. These ASCII bytes are the PBKDF2 salt.
    #[must_use]
    pub const fn salt(&self) -> &'a str {
        self.salt
    }

    /// The stored base64 key.
    #[must_use]
    pub const fn key(&self) -> &'a str {
        self.key
    }

    /// Derive the base64 key for `candidate` with this hash's parameters.
    #[must_use]
    pub fn derive(&self, candidate: &str) -> String {
        let mut derived = [0u8; KEY_LENGTH];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            candidate.as_bytes(),
            self.salt.as_bytes(),
            self.iterations,
            &mut derived,
        );
        Base64::encode_string(&derived)
    }

    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let derived = self.derive(candidate);
        constant_time_eq(derived.as_bytes(), self.key.as_bytes())
    }
}

impl fmt::Debug for Pbkdf2Hash<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pbkdf2Hash")
            .field("iterations", &self.iterations)
            .field("salt", &"***")
            .field("key", &"***")
            .finish()
    }
}

/// Plain decimal digits only: no sign (`+100000`), no whitespace, no zero.
fn parse_iterations(field: &str) -> Result<u32, HashError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HashError::InvalidIterations);
    }

    match field.parse::<u32>() {
        Ok(iterations) if (1..=MAX_ITERATIONS).contains(&iterations) => Ok(iterations),
        _ => Err(HashError::InvalidIterations),
    }
}
