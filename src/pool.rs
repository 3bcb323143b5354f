//! Connection pools for the legacy account database.
//!
//! One pool per provider component. A pool is created the first time a
//! transaction needs a connection, dropped when that component's
//! configuration changes, and closed on shutdown.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, PgPool, Postgres,
};
use std::{collections::HashMap, fmt, str::FromStr, time::Duration};
use tokio::sync::Mutex;
use tracing::{info, instrument, Instrument};
use url::Url;

pub const POOL_MAX_SIZE: u32 = 5;
pub const POOL_MIN_IDLE: u32 = 1;
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
pub const MAX_LIFETIME: Duration = Duration::from_secs(600);

pub const DEFAULT_DSN: &str = "postgres://localhost:5432/galaxy";
pub const DEFAULT_DB_USER: &str = "galaxy";

/// Connection settings for one provider component.
#[derive(Clone)]
pub struct ComponentConfig {
    id: String,
    dsn: String,
    db_user: String,
    db_password: SecretString,
}

impl ComponentConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dsn: dsn.into(),
            db_user: DEFAULT_DB_USER.to_string(),
            db_password: SecretString::from(""),
        }
    }

    #[must_use]
    pub fn with_db_user(mut self, db_user: impl Into<String>) -> Self {
        self.db_user = db_user.into();
        self
    }

    #[must_use]
    pub fn with_db_password(mut self, db_password: SecretString) -> Self {
        self.db_password = db_password;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn db_user(&self) -> &str {
        &self.db_user
    }

    /// Check the DSN shape without connecting.
    ///
    /// # Errors
    /// Returns an error if the DSN is blank or not a Postgres URL.
    pub fn validate(&self) -> Result<()> {
        let dsn = normalize_dsn(&self.dsn);
        if dsn.trim().is_empty() {
            return Err(anyhow!("database DSN is required"));
        }

        let url = Url::parse(dsn).with_context(|| format!("invalid database DSN for component {}", self.id))?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(()),
            scheme => Err(anyhow!(
                "database DSN must use the postgres:// scheme, got {scheme}://"
            )),
        }
    }

    /// Build connect options, applying the configured user and password.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        self.validate()?;

        let mut options = PgConnectOptions::from_str(normalize_dsn(&self.dsn))
            .with_context(|| format!("invalid database DSN for component {}", self.id))?;

        if !self.db_user.is_empty() {
            options = options.username(&self.db_user);
        }

        let password = self.db_password.expose_secret();
        if !password.is_empty() {
            options = options.password(password);
        }

        Ok(options)
    }

    fn redacted_dsn(&self) -> String {
        Url::parse(normalize_dsn(&self.dsn)).map_or_else(
            |_| "<invalid>".to_string(),
            |mut url| {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            },
        )
    }
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("id", &self.id)
            .field("dsn", &self.redacted_dsn())
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .finish()
    }
}

/// Operators migrating from a JDBC setup tend to paste `jdbc:postgresql://...`.
fn normalize_dsn(dsn: &str) -> &str {
    dsn.trim().strip_prefix("jdbc:").unwrap_or_else(|| dsn.trim())
}

/// Pools keyed by component id.
#[derive(Default)]
pub struct PoolManager {
    pools: Mutex<HashMap<String, PgPool>>,
}

impl PoolManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the component's pool, creating it on first use.
    ///
    /// # Errors
    /// Returns an error if the component configuration is invalid.
    pub async fn pool(&self, config: &ComponentConfig) -> Result<PgPool> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(config.id()) {
            return Ok(pool.clone());
        }

        info!(component = config.id(), "creating account database pool");
        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_SIZE)
            .min_connections(POOL_MIN_IDLE)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
            .test_before_acquire(true)
            .connect_lazy_with(config.connect_options()?);
        pools.insert(config.id().to_string(), pool.clone());

        Ok(pool)
    }

    /// Check out one connection for a transaction.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or no connection is available in time.
    #[instrument(skip(self))]
    pub async fn acquire(&self, config: &ComponentConfig) -> Result<PoolConnection<Postgres>> {
        let pool = self.pool(config).await?;
        let span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        pool.acquire()
            .instrument(span)
            .await
            .context("failed to acquire account database connection")
    }

    /// Drop the pool of a component whose configuration changed. The next
    /// [`acquire`](Self::acquire) builds a new one. Returns whether a pool existed.
    pub async fn on_update(&self, component_id: &str) -> bool {
        let removed = self.pools.lock().await.remove(component_id);
        match removed {
            Some(pool) => {
                info!(component = component_id, "closing account database pool after config update");
                pool.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every pool.
    pub async fn shutdown(&self) {
        let pools: Vec<(String, PgPool)> = self.pools.lock().await.drain().collect();
        for (id, pool) in pools {
            info!(component = id, "shutting down account database pool");
            pool.close().await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn is_registered(&self, component_id: &str) -> bool {
        self.pools.lock().await.contains_key(component_id)
    }

    /// Validate a configuration by opening and closing one direct connection.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid or the database cannot be reached.
    pub async fn validate(config: &ComponentConfig) -> Result<()> {
        let options = config.connect_options()?;
        let conn = sqlx::PgConnection::connect_with(&options)
            .await
            .with_context(|| format!("cannot connect to account database for component {}", config.id()))?;
        let _ = conn.close().await;
        info!(component = config.id(), "account database connection validated");
        Ok(())
    }
}
