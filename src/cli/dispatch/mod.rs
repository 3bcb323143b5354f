//! Maps validated CLI matches to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{database, vault};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let database = database::Options::parse(matches)?;
    let vault = vault::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        database,
        vault,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::{
        self,
        test_support::{with_clean_env, with_env},
        vault::SecretId,
    };
    use secrecy::ExposeSecret;

    fn server_args(args: &[&str]) -> Result<Args> {
        let matches = commands::new().try_get_matches_from(args)?;
        let Action::Server(args) = handler(&matches)?;
        Ok(args)
    }

    #[test]
    fn defaults_without_vault() -> Result<()> {
        with_clean_env(|| {
            let args = server_args(&["federa"])?;
            assert_eq!(args.port, 8080);
            assert_eq!(args.database.component_id, "default");
            assert_eq!(args.database.db_user, "galaxy");
            assert_eq!(args.database.db_password.expose_secret(), "");
            assert!(args.vault.is_none());
            Ok(())
        })
    }

    #[test]
    fn vault_with_secret_id() -> Result<()> {
        with_env(
            &[
                ("FEDERA_VAULT_URL", "https://vault.tld:8200/v1/auth/approle/login"),
                ("FEDERA_VAULT_ROLE_ID", "role"),
                ("FEDERA_VAULT_SECRET_ID", "secret"),
                ("FEDERA_VAULT_DB_ROLE", "galaxy-ro"),
            ],
            || {
                let args = server_args(&["federa"])?;
                let vault = args.vault.ok_or_else(|| anyhow::anyhow!("vault options"))?;
                assert_eq!(vault.role_id, "role");
                assert_eq!(vault.secret_id, SecretId::Plain("secret".to_string()));
                assert_eq!(vault.db_role, "galaxy-ro");
                Ok(())
            },
        )
    }

    #[test]
    fn vault_with_wrapped_token() -> Result<()> {
        with_clean_env(|| {
            let args = server_args(&[
                "federa",
                "--vault-url",
                "https://vault.tld:8200/v1/auth/approle/login",
                "--vault-role-id",
                "role",
                "--vault-wrapped-token",
                "wrapped",
            ])?;
            let secret_id = args.vault.map(|vault| vault.secret_id);
            assert_eq!(secret_id, Some(SecretId::Wrapped("wrapped".to_string())));
            Ok(())
        })
    }

    #[test]
    fn vault_requires_role_id() {
        with_clean_env(|| {
            let result = server_args(&[
                "federa",
                "--vault-url",
                "https://vault.tld:8200/v1/auth/approle/login",
                "--vault-secret-id",
                "secret",
            ]);
            assert!(result.is_err_and(|err| err.to_string().contains("--vault-role-id")));
        });
    }

    #[test]
    fn vault_requires_secret() {
        with_clean_env(|| {
            let result = server_args(&[
                "federa",
                "--vault-url",
                "https://vault.tld:8200/v1/auth/approle/login",
                "--vault-role-id",
                "role",
            ]);
            assert!(result.is_err_and(|err| err.to_string().contains("--vault-wrapped-token")));
        });
    }

    #[test]
    fn debug_hides_secrets() -> Result<()> {
        with_clean_env(|| {
            let args = server_args(&[
                "federa",
                "--db-password",
                "db-secret",
                "--vault-url",
                "https://vault.tld:8200/v1/auth/approle/login",
                "--vault-role-id",
                "role",
                "--vault-secret-id",
                "vault-secret",
            ])?;
            let rendered = format!("{args:?}");
            assert!(!rendered.contains("db-secret"));
            assert!(!rendered.contains("vault-secret"));
            Ok(())
        })
    }
}
