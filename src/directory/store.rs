//! Read-only access to the legacy account table.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Which column a lookup matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Email,
    Username,
}

impl Lookup {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Username => "username",
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active account row, password column included.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for AccountRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRow")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account query failed")]
    Query(#[from] sqlx::Error),
    #[error("account database unavailable: {0}")]
    Unavailable(String),
}

/// Row fetch for one authentication transaction.
///
/// Implementations must only return active, non-deleted accounts and must
/// report failures as errors rather than as a missing row.
#[async_trait]
pub trait AccountStore: Send {
    async fn fetch(&mut self, lookup: Lookup, value: &str)
        -> Result<Option<AccountRow>, StoreError>;
}

#[async_trait]
impl<S: AccountStore + ?Sized> AccountStore for Box<S> {
    async fn fetch(
        &mut self,
        lookup: Lookup,
        value: &str,
    ) -> Result<Option<AccountRow>, StoreError> {
        (**self).fetch(lookup, value).await
    }
}

/// Opens a fresh [`AccountStore`] per authentication transaction.
#[async_trait]
pub trait StoreSource: Send + Sync {
    /// # Errors
    /// Returns [`StoreError`] if no connection can be obtained.
    async fn open(&self) -> Result<Box<dyn AccountStore>, StoreError>;

    /// # Errors
    /// Returns [`StoreError`] if the database does not answer.
    async fn ping(&self) -> Result<(), StoreError>;
}
