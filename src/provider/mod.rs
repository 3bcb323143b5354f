//! The read-only federation provider a host talks to.
//!
//! A [`Provider`] wraps one [`DirectoryCache`] and therefore lives for one
//! authentication transaction. It only understands password credentials and
//! rejects every attempt to change or disable them.

mod credential;
mod error;
mod storage_id;

pub use self::credential::{CredentialInput, CredentialType, PASSWORD};
pub use self::error::ProviderError;
pub use self::storage_id::StorageId;

use crate::directory::{Account, AccountStore, DirectoryCache};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Operations an identity-management host performs against a user federation.
#[async_trait]
pub trait UserFederation: Send {
    /// Look up by login name: email first, then username.
    async fn user_by_username(&mut self, username: &str) -> Option<Account>;

    async fn user_by_email(&mut self, email: &str) -> Option<Account>;

    /// Look up by host storage id, see [`StorageId`].
    async fn user_by_id(&mut self, id: &str) -> Option<Account>;

    fn supports_credential_type(&self, kind: &CredentialType) -> bool;

    fn is_configured_for(&self, user: &Account, kind: &CredentialType) -> bool;

    /// # Errors
    /// [`ProviderError::UnsupportedCredentialType`] for anything but a password.
    fn is_valid(&self, user: &Account, input: &CredentialInput) -> Result<bool, ProviderError>;

    /// # Errors
    /// Always fails; credentials are owned by the legacy database.
    fn update_credential(
        &mut self,
        user: &Account,
        input: &CredentialInput,
    ) -> Result<(), ProviderError>;

    /// # Errors
    /// Always fails with [`ProviderError::ReadOnly`].
    fn disable_credential_type(
        &mut self,
        user: &Account,
        kind: &CredentialType,
    ) -> Result<(), ProviderError>;

    fn disableable_credential_types(&self, user: &Account) -> Vec<CredentialType>;
}

/// Rejection for a credential update of `kind`, independent of any account.
#[must_use]
pub fn update_rejection(kind: &CredentialType) -> ProviderError {
    match kind {
        CredentialType::Password => ProviderError::ReadOnly,
        CredentialType::Other(name) => ProviderError::UnsupportedCredentialType(name.clone()),
    }
}

pub struct Provider<S> {
    component_id: String,
    directory: DirectoryCache<S>,
}

impl<S: AccountStore> Provider<S> {
    #[must_use]
    pub fn new(component_id: impl Into<String>, store: S) -> Self {
        Self {
            component_id: component_id.into(),
            directory: DirectoryCache::new(store),
        }
    }

    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Id under which the host stores `user`.
    #[must_use]
    pub fn storage_id(&self, user: &Account) -> StorageId {
        StorageId::new(self.component_id.as_str(), user.email())
    }
}

#[async_trait]
impl<S: AccountStore> UserFederation for Provider<S> {
    async fn user_by_username(&mut self, username: &str) -> Option<Account> {
        self.directory.resolve_login(username).await
    }

    async fn user_by_email(&mut self, email: &str) -> Option<Account> {
        self.directory.resolve_by_email(email).await
    }

    #[instrument(skip(self))]
    async fn user_by_id(&mut self, id: &str) -> Option<Account> {
        let Some(storage_id) = StorageId::parse(id) else {
            debug!("malformed storage id");
            return None;
        };

        if let Some(component) = storage_id.component() {
            if component != self.component_id {
                debug!(other = component, "storage id belongs to another component");
                return None;
            }
        }

        self.directory.resolve_by_email(storage_id.external()).await
    }

    fn supports_credential_type(&self, kind: &CredentialType) -> bool {
        *kind == CredentialType::Password
    }

    fn is_configured_for(&self, user: &Account, kind: &CredentialType) -> bool {
        self.supports_credential_type(kind) && self.directory.has_password(user.email())
    }

    fn is_valid(&self, user: &Account, input: &CredentialInput) -> Result<bool, ProviderError> {
        if !self.supports_credential_type(input.kind()) {
            return Err(ProviderError::UnsupportedCredentialType(
                input.kind().to_string(),
            ));
        }

        Ok(self
            .directory
            .check_credential(user.email(), input.expose_value()))
    }

    fn update_credential(
        &mut self,
        user: &Account,
        input: &CredentialInput,
    ) -> Result<(), ProviderError> {
        warn!(
            account_id = user.id(),
            kind = %input.kind(),
            "rejected credential update"
        );
        Err(update_rejection(input.kind()))
    }

    fn disable_credential_type(
        &mut self,
        user: &Account,
        kind: &CredentialType,
    ) -> Result<(), ProviderError> {
        warn!(account_id = user.id(), %kind, "rejected credential disable");
        Err(ProviderError::ReadOnly)
    }

    fn disableable_credential_types(&self, _user: &Account) -> Vec<CredentialType> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::test_support::{alice, bob, row, MockStore};
    use std::sync::atomic::Ordering;

    fn provider(store: MockStore) -> Provider<MockStore> {
        Provider::new("galaxy", store)
    }

    #[tokio::test]
    async fn user_by_username_accepts_email_or_username() {
        let (store, calls) = MockStore::new(vec![bob()]);
        let mut provider = provider(store);

        let by_name = provider.user_by_username("bob").await;
        assert_eq!(by_name.as_ref().map(Account::id), Some("u2"));
        assert_eq!(calls.by_email.load(Ordering::SeqCst), 1);
        assert_eq!(calls.by_username.load(Ordering::SeqCst), 1);

        let by_email = provider.user_by_username("bob@example.org").await;
        assert_eq!(by_email, by_name);
        assert_eq!(calls.total(), 2);
    }

    #[tokio::test]
    async fn user_by_id_round_trips_storage_id() {
        let (store, _calls) = MockStore::new(vec![alice()]);
        let mut provider = provider(store);

        let Some(user) = provider.user_by_email("alice@example.org").await else {
            panic!("alice should resolve");
        };
        let id = provider.storage_id(&user).to_string();
        assert_eq!(id, "f:galaxy:alice@example.org");

        assert_eq!(provider.user_by_id(&id).await, Some(user.clone()));
        assert_eq!(provider.user_by_id("alice@example.org").await, Some(user));
    }

    #[tokio::test]
    async fn user_by_id_rejects_foreign_and_malformed_ids() {
        let (store, calls) = MockStore::new(vec![alice()]);
        let mut provider = provider(store);

        assert_eq!(provider.user_by_id("f:other:alice@example.org").await, None);
        assert_eq!(provider.user_by_id("f:galaxy").await, None);
        assert_eq!(provider.user_by_id("").await, None);
        assert_eq!(calls.total(), 0);
    }

    #[tokio::test]
    async fn password_validation() {
        let (store, _calls) = MockStore::new(vec![bob()]);
        let mut provider = provider(store);
        let Some(user) = provider.user_by_username("bob").await else {
            panic!("bob should resolve");
        };

        assert_eq!(
            provider.is_valid(&user, &CredentialInput::password("hunter2")),
            Ok(true)
        );
        assert_eq!(
            provider.is_valid(&user, &CredentialInput::password("hunter3")),
            Ok(false)
        );

        let otp = CredentialInput::new(CredentialType::from("otp"), "123456".into());
        assert_eq!(
            provider.is_valid(&user, &otp),
            Err(ProviderError::UnsupportedCredentialType("otp".to_string()))
        );
    }

    #[tokio::test]
    async fn capabilities() {
        let mut without_password = row("u3", "carol@example.org", "carol", "");
        without_password.password = None;
        let (store, _calls) = MockStore::new(vec![alice(), without_password]);
        let mut provider = provider(store);

        let otp = CredentialType::from("otp");
        assert!(provider.supports_credential_type(&CredentialType::Password));
        assert!(!provider.supports_credential_type(&otp));

        let Some(alice) = provider.user_by_email("alice@example.org").await else {
            panic!("alice should resolve");
        };
        let Some(carol) = provider.user_by_email("carol@example.org").await else {
            panic!("carol should resolve");
        };

        assert!(provider.is_configured_for(&alice, &CredentialType::Password));
        assert!(!provider.is_configured_for(&alice, &otp));
        assert!(!provider.is_configured_for(&carol, &CredentialType::Password));
        assert!(provider.disableable_credential_types(&alice).is_empty());
    }

    #[tokio::test]
    async fn is_configured_for_unresolved_account_is_false() {
        let (store, calls) = MockStore::new(vec![alice()]);
        let provider = provider(store);
        let stranger = Account::new("u1", "alice@example.org", "alice");

        assert!(!provider.is_configured_for(&stranger, &CredentialType::Password));
        assert_eq!(calls.total(), 0);
    }

    #[tokio::test]
    async fn writes_are_rejected() {
        let (store, calls) = MockStore::new(vec![alice()]);
        let mut provider = provider(store);
        let user = Account::new("u1", "alice@example.org", "alice");

        assert_eq!(
            provider.update_credential(&user, &CredentialInput::password("new")),
            Err(ProviderError::ReadOnly)
        );
        let otp = CredentialInput::new(CredentialType::from("otp"), "1".into());
        assert_eq!(
            provider.update_credential(&user, &otp),
            Err(ProviderError::UnsupportedCredentialType("otp".to_string()))
        );
        assert_eq!(
            provider.disable_credential_type(&user, &CredentialType::Password),
            Err(ProviderError::ReadOnly)
        );
        assert_eq!(calls.total(), 0);
    }

    #[test]
    fn read_only_message_is_user_facing() {
        assert!(ProviderError::ReadOnly
            .to_string()
            .contains("managed externally"));
    }
}
