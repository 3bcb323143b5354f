use crate::pool::{ComponentConfig, DEFAULT_DB_USER, DEFAULT_DSN};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_COMPONENT_ID: &str = "component-id";

pub const DEFAULT_COMPONENT_ID: &str = "default";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Legacy account database connection string")
                .long_help(
                    "Legacy account database connection string. A `jdbc:` prefix is accepted. \
                     The user and password are taken from --db-user/--db-password, or from Vault when --vault-url is set.",
                )
                .env("FEDERA_DSN")
                .default_value(DEFAULT_DSN),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("Account database user")
                .env("FEDERA_DB_USER")
                .default_value(DEFAULT_DB_USER),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("Account database password")
                .env("FEDERA_DB_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_COMPONENT_ID)
                .long(ARG_COMPONENT_ID)
                .help("Provider component id, used in host storage ids")
                .env("FEDERA_COMPONENT_ID")
                .default_value(DEFAULT_COMPONENT_ID),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub component_id: String,
    pub dsn: String,
    pub db_user: String,
    pub db_password: SecretString,
}

impl Options {
    /// # Errors
    /// Returns an error if a required value is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            component_id: matches
                .get_one::<String>(ARG_COMPONENT_ID)
                .cloned()
                .context("missing required argument: --component-id")?,
            dsn: matches
                .get_one::<String>(ARG_DSN)
                .cloned()
                .context("missing required argument: --dsn")?,
            db_user: matches
                .get_one::<String>(ARG_DB_USER)
                .cloned()
                .unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
            db_password: matches
                .get_one::<String>(ARG_DB_PASSWORD)
                .map_or_else(SecretString::default, |password| {
                    SecretString::from(password.as_str())
                }),
        })
    }

    #[must_use]
    pub fn component_config(&self) -> ComponentConfig {
        ComponentConfig::new(self.component_id.as_str(), self.dsn.as_str())
            .with_db_user(self.db_user.as_str())
            .with_db_password(self.db_password.clone())
    }
}
