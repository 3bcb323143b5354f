//! Vault client for dynamic account-database credentials.
//!
//! Only used when `--vault-url` is set: `AppRole` login, database credentials
//! for the configured role, and background renewal of both leases.

pub mod database;
pub mod renew;

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

/// Build `scheme://host:port<path>` from any Vault URL.
///
/// # Errors
/// Returns an error if `url` cannot be parsed, has no host, or uses an unsupported scheme.
#[instrument]
pub fn endpoint_url(url: &str, path: &str) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("invalid Vault URL: {url}"))?;

    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?;

    let port = match url.port() {
        Some(port) => port,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    let endpoint = format!("{scheme}://{host}:{port}{path}");

    debug!("endpoint URL: {}", endpoint);

    Ok(endpoint)
}

pub(crate) fn client() -> Result<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .build()
        .context("failed to build Vault HTTP client")
}

/// Turn a non-success Vault response into an error carrying its first message.
pub(crate) async fn check(url: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(anyhow!(
            "{} - {}, {}",
            url,
            status,
            body["errors"][0].as_str().unwrap_or("")
        ));
    }

    Ok(body)
}

/// Unwrap a wrapped secret id.
/// Create one with:
/// vault write -wrap-ttl=300s -f auth/approle/role/federa/secret-id
///
/// # Errors
/// Returns an error if the Vault request fails or the response has no `secret_id`.
#[instrument(skip(token))]
pub async fn unwrap(url: &str, token: &str) -> Result<String> {
    let unwrap_url = endpoint_url(url, "/v1/sys/wrapping/unwrap")?;

    let response = client()?
        .post(&unwrap_url)
        .header("X-Vault-Token", token)
        .send()
        .await?;

    let body = check(&unwrap_url, response).await?;

    body["data"]["secret_id"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("Error parsing JSON response: no secret_id found"))
}

/// Login with `AppRole`; `url` is the login endpoint itself, for example
/// `https://vault.tld:8200/v1/auth/approle/login`.
///
/// # Errors
/// Returns an error if the Vault request fails or the response has no `client_token`.
#[instrument(skip(sid))]
pub async fn approle_login(url: &str, sid: &str, rid: &str) -> Result<(String, u64)> {
    let response = client()?
        .post(url)
        .json(&json!({
            "role_id": rid,
            "secret_id": sid,
        }))
        .send()
        .await?;

    let body = check(url, response).await?;

    let token = body["auth"]["client_token"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no client_token found"))?;
    let lease_duration = body["auth"]["lease_duration"].as_u64().unwrap_or(1800);

    Ok((token.to_string(), lease_duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn endpoint_url_fills_default_ports() {
        assert_eq!(
            endpoint_url("https://vault.tld/v1/auth/approle/login", "/v1/x").ok(),
            Some("https://vault.tld:443/v1/x".to_string())
        );
        assert_eq!(
            endpoint_url("http://vault.tld", "/v1/x").ok(),
            Some("http://vault.tld:80/v1/x".to_string())
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:8200/v1/auth/approle/login", "/v1/x").ok(),
            Some("http://127.0.0.1:8200/v1/x".to_string())
        );
    }

    #[test]
    fn endpoint_url_rejects_bad_urls() {
        assert!(endpoint_url("not a url", "/v1/x").is_err());
        assert!(endpoint_url("ftp://vault.tld", "/v1/x").is_err());
    }

    #[tokio::test]
    async fn approle_login_returns_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(body_json(json!({"role_id": "role", "secret_id": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": {"client_token": "s.token", "lease_duration": 600}
            })))
            .mount(&server)
            .await;

        let url = format!("{}/v1/auth/approle/login", server.uri());
        let (token, lease) = approle_login(&url, "secret", "role").await?;

        assert_eq!(token, "s.token");
        assert_eq!(lease, 600);
        Ok(())
    }

    #[tokio::test]
    async fn approle_login_surfaces_vault_errors() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": ["invalid role or secret ID"]
            })))
            .mount(&server)
            .await;

        let url = format!("{}/v1/auth/approle/login", server.uri());
        let result = approle_login(&url, "secret", "role").await;

        assert!(result.is_err_and(|err| err.to_string().contains("invalid role or secret ID")));
        Ok(())
    }

    #[tokio::test]
    async fn unwrap_returns_secret_id() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/sys/wrapping/unwrap"))
            .and(header("X-Vault-Token", "wrapped"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"secret_id": "unwrapped-secret"}
            })))
            .mount(&server)
            .await;

        let secret = unwrap(&server.uri(), "wrapped").await?;
        assert_eq!(secret, "unwrapped-secret");
        Ok(())
    }
}
