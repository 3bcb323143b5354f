use secrecy::{ExposeSecret, SecretString};
use std::{convert::Infallible, fmt, str::FromStr};

pub const PASSWORD: &str = "password";

/// Credential kind as named by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialType {
    Password,
    Other(String),
}

impl CredentialType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Password => PASSWORD,
            Self::Other(name) => name,
        }
    }
}

impl FromStr for CredentialType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == PASSWORD {
            Ok(Self::Password)
        } else {
            Ok(Self::Other(s.to_string()))
        }
    }
}

impl From<&str> for CredentialType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential submitted by the host for checking.
#[derive(Debug, Clone)]
pub struct CredentialInput {
    kind: CredentialType,
    value: SecretString,
}

impl CredentialInput {
    #[must_use]
    pub fn new(kind: CredentialType, value: SecretString) -> Self {
        Self { kind, value }
    }

    #[must_use]
    pub fn password(value: impl Into<String>) -> Self {
        Self::new(CredentialType::Password, SecretString::from(value.into()))
    }

    #[must_use]
    pub fn kind(&self) -> &CredentialType {
        &self.kind
    }

    /// The plaintext challenge response.
    #[must_use]
    pub fn expose_value(&self) -> &str {
        self.value.expose_secret()
    }
}
