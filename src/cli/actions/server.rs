use crate::{
    api::{self, handlers::BridgeState},
    cli::{
        commands::{
            database,
            vault::{self as vault_args, SecretId},
        },
        globals::GlobalArgs,
        telemetry,
    },
    directory::postgres::PgStoreSource,
    pool::PoolManager,
    vault,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub database: database::Options,
    pub vault: Option<vault_args::Options>,
}

/// Log in to Vault and fetch account-database credentials.
async fn vault_credentials(opts: &vault_args::Options) -> Result<GlobalArgs> {
    let mut globals = GlobalArgs::new(opts.url.clone());

    let secret_id = match &opts.secret_id {
        SecretId::Plain(secret_id) => secret_id.clone(),
        SecretId::Wrapped(wrapped) => vault::unwrap(&opts.url, wrapped).await?,
    };

    let (token, _) = vault::approle_login(&opts.url, &secret_id, &opts.role_id).await?;
    globals.set_token(SecretString::from(token));

    vault::database::database_creds(&mut globals, &opts.db_role)
        .await
        .context("Could not get database username and password")?;

    debug!("Global args: {:?}", globals);

    Ok(globals)
}

/// Run the HTTP bridge until Ctrl-C or a failed Vault renewal.
///
/// # Errors
/// Returns an error if Vault login fails, the account database is unreachable,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut config = args.database.component_config();

    // Vault renewal failures arrive here
    let (tx, mut rx) = mpsc::unbounded_channel();

    if let Some(opts) = &args.vault {
        let globals = vault_credentials(opts).await?;

        config = config
            .with_db_user(globals.vault_db_username.as_str())
            .with_db_password(globals.vault_db_password.clone());

        vault::renew::try_renew(&globals, tx.clone()).await?;
    }

    PoolManager::validate(&config)
        .await
        .context("account database check failed")?;

    let pools = Arc::new(PoolManager::new());
    let source = Arc::new(PgStoreSource::new(pools.clone(), config.clone()));
    let state = BridgeState::new(config.id(), source);

    let shutdown = async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!("Failed to listen for Ctrl-C: {}", err);
                }
            }
            Some(()) = rx.recv() => warn!("Vault renewal failed, shutting down"),
        }
    };

    let result = api::new(args.port, state, shutdown).await;

    pools.shutdown().await;
    telemetry::shutdown_tracer();
    drop(tx);

    result
}
