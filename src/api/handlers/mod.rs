//! Bridge handlers. Every request is one authentication transaction: it
//! opens a store on a fresh pooled connection, wraps it in a [`Provider`],
//! and drops both when the response is built.

pub mod credentials;
pub mod health;
pub mod users;

use crate::{
    directory::{AccountStore, StoreError, StoreSource},
    provider::Provider,
};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

pub type RequestProvider = Provider<Box<dyn AccountStore>>;

#[derive(Clone)]
pub struct BridgeState {
    component_id: String,
    source: Arc<dyn StoreSource>,
}

impl BridgeState {
    #[must_use]
    pub fn new(component_id: impl Into<String>, source: Arc<dyn StoreSource>) -> Self {
        Self {
            component_id: component_id.into(),
            source,
        }
    }

    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Provider for one request; `None` when no connection is available.
    pub async fn provider(&self) -> Option<RequestProvider> {
        match self.source.open().await {
            Ok(store) => Some(Provider::new(self.component_id.as_str(), store)),
            Err(err) => {
                error!(error = ?err, "failed to open account store");
                None
            }
        }
    }

    /// # Errors
    /// Returns [`StoreError`] if the account database does not answer.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.source.ping().await
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::BridgeState;
    use crate::directory::{
        test_support::{Calls, MockStore},
        AccountRow, AccountStore, StoreError, StoreSource,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Opens a [`MockStore`] over the same rows for every request.
    pub(crate) struct MockSource {
        rows: Vec<AccountRow>,
        down: bool,
        pub(crate) opened: AtomicUsize,
        pub(crate) calls: Arc<Calls>,
    }

    impl MockSource {
        pub(crate) fn new(rows: Vec<AccountRow>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                down: false,
                opened: AtomicUsize::new(0),
                calls: Arc::new(Calls::default()),
            })
        }

        pub(crate) fn down() -> Arc<Self> {
            Arc::new(Self {
                rows: Vec::new(),
                down: true,
                opened: AtomicUsize::new(0),
                calls: Arc::new(Calls::default()),
            })
        }

        pub(crate) fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreSource for MockSource {
        async fn open(&self) -> Result<Box<dyn AccountStore>, StoreError> {
            if self.down {
                return Err(StoreError::Unavailable("pool timed out".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            let store = MockStore::with_calls(self.rows.clone(), self.calls.clone());
            Ok(Box::new(store))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            if self.down {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    pub(crate) fn state(source: Arc<MockSource>) -> BridgeState {
        BridgeState::new("galaxy", source)
    }
}
