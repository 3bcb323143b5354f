use anyhow::{anyhow, Result};
use clap::{Arg, ArgGroup, ArgMatches, Command};

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_WRAPPED_TOKEN: &str = "vault-wrapped-token";
pub const ARG_VAULT_DB_ROLE: &str = "vault-db-role";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault approle login URL, example: https://vault.tld:8200/v1/auth/approle/login")
                .long_help(
                    "Vault approle login URL. When set, account database credentials are \
                     requested from Vault and --db-user/--db-password are ignored.",
                )
                .env("FEDERA_VAULT_URL"),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault role id")
                .env("FEDERA_VAULT_ROLE_ID"),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault secret id")
                .env("FEDERA_VAULT_SECRET_ID")
                .hide_env_values(true)
                .conflicts_with(ARG_VAULT_WRAPPED_TOKEN),
        )
        .arg(
            Arg::new(ARG_VAULT_WRAPPED_TOKEN)
                .long(ARG_VAULT_WRAPPED_TOKEN)
                .help("Vault wrapped token holding the secret id")
                .env("FEDERA_VAULT_WRAPPED_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_VAULT_DB_ROLE)
                .long(ARG_VAULT_DB_ROLE)
                .help("Vault database secrets role")
                .env("FEDERA_VAULT_DB_ROLE")
                .default_value("federa"),
        )
        .group(
            ArgGroup::new("vault-auth")
                .args([ARG_VAULT_ROLE_ID, ARG_VAULT_SECRET_ID, ARG_VAULT_WRAPPED_TOKEN])
                .multiple(true),
        )
}

/// How to obtain the Vault secret id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretId {
    Plain(String),
    Wrapped(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Options {
    pub url: String,
    pub role_id: String,
    pub secret_id: SecretId,
    pub db_role: String,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("url", &self.url)
            .field("role_id", &self.role_id)
            .field("secret_id", &"***")
            .field("db_role", &self.db_role)
            .finish()
    }
}

impl Options {
    /// `None` when Vault is not configured.
    ///
    /// # Errors
    /// Returns an error if `--vault-url` is set without a role id or a secret id.
    pub fn parse(matches: &ArgMatches) -> Result<Option<Self>> {
        let Some(url) = matches.get_one::<String>(ARG_VAULT_URL).cloned() else {
            return Ok(None);
        };

        let role_id = matches
            .get_one::<String>(ARG_VAULT_ROLE_ID)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_VAULT_ROLE_ID}"))?;

        let secret_id = match (
            matches.get_one::<String>(ARG_VAULT_SECRET_ID),
            matches.get_one::<String>(ARG_VAULT_WRAPPED_TOKEN),
        ) {
            (Some(secret_id), _) => SecretId::Plain(secret_id.clone()),
            (None, Some(wrapped)) => SecretId::Wrapped(wrapped.clone()),
            (None, None) => {
                return Err(anyhow!(
                    "missing required argument: --{ARG_VAULT_SECRET_ID} or --{ARG_VAULT_WRAPPED_TOKEN}"
                ))
            }
        };

        let db_role = matches
            .get_one::<String>(ARG_VAULT_DB_ROLE)
            .cloned()
            .unwrap_or_else(|| "federa".to_string());

        Ok(Some(Self {
            url,
            role_id,
            secret_id,
            db_role,
        }))
    }
}
