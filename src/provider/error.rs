use thiserror::Error;

/// Rejections a host can receive from the provider.
///
/// These are distinct from a failed authentication: a host should surface
/// them to the user as-is instead of "invalid credentials".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("credentials are managed externally and cannot be changed here")]
    ReadOnly,
    #[error("unsupported credential type: {0}")]
    UnsupportedCredentialType(String),
}
