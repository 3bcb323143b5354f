//! Account rows from the legacy Postgres database.

use super::{AccountRow, AccountStore, Lookup, StoreError, StoreSource};
use crate::pool::{ComponentConfig, PoolManager};
use async_trait::async_trait;
use sqlx::{pool::PoolConnection, Connection, Postgres, Row};
use std::sync::Arc;
use tracing::Instrument;

const QUERY_BY_EMAIL: &str = r"
    SELECT id::text AS id, email, username, password
    FROM galaxy_user
    WHERE email = $1 AND deleted = false AND active = true
    LIMIT 1
";

const QUERY_BY_USERNAME: &str = r"
    SELECT id::text AS id, email, username, password
    FROM galaxy_user
    WHERE username = $1 AND deleted = false AND active = true
    LIMIT 1
";

const fn query_for(lookup: Lookup) -> &'static str {
    match lookup {
        Lookup::Email => QUERY_BY_EMAIL,
        Lookup::Username => QUERY_BY_USERNAME,
    }
}

/// Holds one pooled connection for the lifetime of a transaction; dropping
/// the store hands the connection back to the pool.
pub struct PgAccountStore {
    conn: PoolConnection<Postgres>,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(conn: PoolConnection<Postgres>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn fetch(
        &mut self,
        lookup: Lookup,
        value: &str,
    ) -> Result<Option<AccountRow>, StoreError> {
        let query = query_for(lookup);
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(value)
            .fetch_optional(&mut *self.conn)
            .instrument(span)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(AccountRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
        }))
    }
}

/// Opens [`PgAccountStore`]s from the pool registered for one component.
pub struct PgStoreSource {
    pools: Arc<PoolManager>,
    config: ComponentConfig,
}

impl PgStoreSource {
    #[must_use]
    pub fn new(pools: Arc<PoolManager>, config: ComponentConfig) -> Self {
        Self { pools, config }
    }
}

#[async_trait]
impl StoreSource for PgStoreSource {
    async fn open(&self) -> Result<Box<dyn AccountStore>, StoreError> {
        let conn = self
            .pools
            .acquire(&self.config)
            .await
            .map_err(|err| StoreError::Unavailable(format!("{err:#}")))?;
        Ok(Box::new(PgAccountStore::new(conn)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pools
            .acquire(&self.config)
            .await
            .map_err(|err| StoreError::Unavailable(format!("{err:#}")))?;
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(span).await?;
        Ok(())
    }
}
