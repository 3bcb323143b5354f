use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

/// Fetch dynamic account-database credentials for `role` and store them,
/// with their lease, in `globals`.
///
/// # Errors
/// Returns an error if the Vault request fails or the response is missing expected fields.
#[instrument(skip(globals))]
pub async fn database_creds(globals: &mut GlobalArgs, role: &str) -> Result<()> {
    let creds_url = vault::endpoint_url(&globals.vault_url, &format!("/v1/database/creds/{role}"))?;

    let response = vault::client()?
        .get(&creds_url)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .await?;

    let body = vault::check(&creds_url, response).await?;

    globals.vault_db_lease_id = body["lease_id"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_id found"))?
        .to_string();

    globals.vault_db_lease_duration = body["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))?;

    globals.vault_db_username = body["data"]["username"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no username found"))?
        .to_string();

    let password = body["data"]["password"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no password found"))?;
    globals.vault_db_password = SecretString::from(password);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::database_creds;
    use crate::cli::globals::GlobalArgs;
    use anyhow::Result;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn database_creds_updates_globals() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/database/creds/galaxy-ro"))
            .and(header("X-Vault-Token", "vault-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lease_id": "database/creds/galaxy-ro/abc",
                "lease_duration": 55,
                "data": {"username": "v-federa-ro", "password": "pass"}
            })))
            .mount(&server)
            .await;

        let mut globals = GlobalArgs::new(server.uri());
        globals.set_token(SecretString::from("vault-token"));

        database_creds(&mut globals, "galaxy-ro").await?;

        assert_eq!(globals.vault_db_lease_id, "database/creds/galaxy-ro/abc");
        assert_eq!(globals.vault_db_lease_duration, 55);
        assert_eq!(globals.vault_db_username, "v-federa-ro");
        assert_eq!(globals.vault_db_password.expose_secret(), "pass");
        Ok(())
    }

    #[tokio::test]
    async fn database_creds_requires_password() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lease_id": "lease",
                "lease_duration": 55,
                "data": {"username": "user"}
            })))
            .mount(&server)
            .await;

        let mut globals = GlobalArgs::new(server.uri());
        let result = database_creds(&mut globals, "federa").await;

        assert!(result.is_err_and(|err| err.to_string().contains("no password found")));
        Ok(())
    }
}
