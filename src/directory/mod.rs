//! Per-transaction account directory.
//!
//! A [`DirectoryCache`] lives for exactly one authentication transaction. It
//! resolves login identifiers through an [`AccountStore`], remembers every
//! account it found together with its stored password hash, and answers
//! credential checks from that memory. Nothing outlives the transaction: the
//! cache and the store's connection are dropped together.
//!
//! Cached accounts are matched on both the email and the username, so an
//! account fetched by one identifier also satisfies a later lookup by the
//! other. When two cached accounts match the same identifier, the one
//! resolved first in the transaction answers. Misses are never cached; each
//! one goes back to the database.

mod account;
pub mod postgres;
mod store;

pub use self::account::Account;
pub use self::store::{AccountRow, AccountStore, Lookup, StoreError, StoreSource};

use crate::password::StoredHash;
use tracing::{debug, error, instrument, warn};

struct CacheEntry {
    account: Account,
    stored_hash: Option<String>,
}

pub struct DirectoryCache<S> {
    store: S,
    // insertion order; the first account resolved wins a scan
    entries: Vec<CacheEntry>,
}

impl<S: AccountStore> DirectoryCache<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: Vec::new(),
        }
    }

    /// Resolve an account by email.
    pub async fn resolve_by_email(&mut self, email: &str) -> Option<Account> {
        self.resolve(Lookup::Email, email).await
    }

    /// Resolve an account by username.
    pub async fn resolve_by_username(&mut self, username: &str) -> Option<Account> {
        self.resolve(Lookup::Username, username).await
    }

    /// Resolve a login name: email first, username only if that finds nothing.
    pub async fn resolve_login(&mut self, login: &str) -> Option<Account> {
        if let Some(account) = self.resolve_by_email(login).await {
            return Some(account);
        }
        self.resolve_by_username(login).await
    }

    /// Check `candidate` against the stored hash of an account resolved earlier
    /// in this transaction. Never fetches.
    #[must_use]
    pub fn check_credential(&self, email: &str, candidate: &str) -> bool {
        let Some(entry) = self.entry(email) else {
            debug!("credential check for an account not resolved in this transaction");
            return false;
        };

        let Some(stored) = entry.stored_hash.as_deref() else {
            warn!(account_id = entry.account.id(), "account has no stored password");
            return false;
        };

        match StoredHash::parse(stored) {
            Ok(hash) => {
                debug!(
                    account_id = entry.account.id(),
                    scheme = hash.scheme(),
                    "verifying password"
                );
                hash.verify(candidate)
            }
            Err(err) => {
                warn!(
                    account_id = entry.account.id(),
                    reason = %err,
                    "stored password hash is malformed"
                );
                false
            }
        }
    }

    /// Whether a stored hash is held for the account with this email.
    #[must_use]
    pub fn has_password(&self, email: &str) -> bool {
        self.entry(email)
            .is_some_and(|entry| entry.stored_hash.is_some())
    }

    fn entry(&self, email: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|entry| entry.account.email() == email)
    }

    #[instrument(skip(self), level = "debug")]
    async fn resolve(&mut self, lookup: Lookup, identifier: &str) -> Option<Account> {
        if let Some(entry) = self.entries.iter().find(|e| e.account.matches(identifier)) {
            debug!(account_id = entry.account.id(), "account served from transaction cache");
            return Some(entry.account.clone());
        }

        match self.store.fetch(lookup, identifier).await {
            Ok(Some(row)) => {
                let AccountRow {
                    id,
                    email,
                    username,
                    password,
                } = row;
                let account = Account::new(id, email, username);
                debug!(account_id = account.id(), "account loaded");
                self.entries.push(CacheEntry {
                    account: account.clone(),
                    stored_hash: password,
                });
                Some(account)
            }
            Ok(None) => {
                debug!("no active account matched");
                None
            }
            Err(err) => {
                error!(%lookup, error = ?err, "account lookup failed");
                None
            }
        }
    }
}
