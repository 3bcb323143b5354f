use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::future::Future;
use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};
use tracing::{debug, error, info, instrument, warn};

const ATTEMPTS: u32 = 3;

/// Renew the Vault token, returns the new lease duration in seconds.
#[instrument(skip(token))]
async fn renew_token(url: &str, token: &SecretString) -> Result<u64> {
    let renew_url = vault::endpoint_url(url, "/v1/auth/token/renew-self")?;

    let response = vault::client()?
        .post(&renew_url)
        .header("X-Vault-Token", token.expose_secret())
        .json(&json!({}))
        .send()
        .await?;

    let body = vault::check(&renew_url, response).await?;

    body["auth"]["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

/// Renew the database credentials lease, returns the new lease duration in seconds.
#[instrument(skip(token))]
async fn renew_db_lease(
    url: &str,
    token: &SecretString,
    lease_id: &str,
    increment: u64,
) -> Result<u64> {
    let renew_url = vault::endpoint_url(url, "/v1/sys/leases/renew")?;

    let response = vault::client()?
        .put(&renew_url)
        .header("X-Vault-Token", token.expose_secret())
        .json(&json!({
            "lease_id": lease_id,
            "increment": increment,
        }))
        .send()
        .await?;

    let body = vault::check(&renew_url, response).await?;

    body["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

/// 70-90% of the lease.
fn jittered(lease_duration: u64, rng: &mut impl Rng) -> Duration {
    let factor = rng.gen_range(70..90);
    Duration::from_secs(lease_duration.saturating_mul(factor) / 100)
}

/// Renew forever, signalling `tx` and stopping after [`ATTEMPTS`] consecutive failures.
async fn keep_renewing<F, Fut>(what: &'static str, mut renew: F, tx: mpsc::UnboundedSender<()>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let mut rng = StdRng::from_entropy();

    loop {
        let mut lease_duration = None;

        for attempt in 1..=ATTEMPTS {
            if attempt > 1 {
                let backoff_time = 2u64.pow(attempt - 1);
                warn!("Backing off for {} seconds", backoff_time);
                sleep(Duration::from_secs(backoff_time)).await;
            }

            match renew().await {
                Ok(duration) => {
                    lease_duration = Some(duration);
                    break;
                }
                Err(e) => error!("Failed to renew {}: {}", what, e),
            }
        }

        let Some(lease_duration) = lease_duration else {
            error!("Failed to renew {} after {} attempts", what, ATTEMPTS);
            let _ = tx.send(());
            return;
        };

        if lease_duration == 0 {
            info!("{} does not expire, renewal stopped", what);
            return;
        }

        let delay = jittered(lease_duration, &mut rng);
        debug!("Will renew {} in {} seconds", what, delay.as_secs());
        sleep(delay).await;
    }
}

/// Keep the Vault token and the database lease alive in the background.
/// A renewal that keeps failing sends on `tx` so the server can shut down.
///
/// # Errors
/// Does not currently fail; renewal errors are reported through `tx`.
#[instrument(skip(globals, tx))]
pub async fn try_renew(globals: &GlobalArgs, tx: mpsc::UnboundedSender<()>) -> Result<()> {
    tokio::spawn({
        let url = globals.vault_url.clone();
        let token = globals.vault_token.clone();
        let tx = tx.clone();

        async move {
            keep_renewing("token", || renew_token(&url, &token), tx).await;
        }
    });

    if globals.vault_db_lease_id.is_empty() {
        return Ok(());
    }

    tokio::spawn({
        let url = globals.vault_url.clone();
        let token = globals.vault_token.clone();
        let lease_id = globals.vault_db_lease_id.clone();
        let increment = globals.vault_db_lease_duration;

        async move {
            keep_renewing(
                "DB lease",
                || renew_db_lease(&url, &token, &lease_id, increment),
                tx,
            )
            .await;
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn jitter_stays_below_lease() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delay = jittered(1000, &mut rng).as_secs();
            assert!((700..900).contains(&delay), "{delay}");
        }
        assert_eq!(jittered(0, &mut rng), Duration::ZERO);
    }

    #[test]
    fn jitter_saturates_on_huge_lease() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = jittered(u64::MAX, &mut rng);
        assert_eq!(delay, Duration::from_secs(u64::MAX / 100));
    }

    #[tokio::test]
    async fn renew_token_reads_lease() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/auth/token/renew-self"))
            .and(header("X-Vault-Token", "token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": {"lease_duration": 3600}
            })))
            .mount(&server)
            .await;

        let lease = renew_token(&server.uri(), &SecretString::from("token")).await?;
        assert_eq!(lease, 3600);
        Ok(())
    }

    #[tokio::test]
    async fn renew_db_lease_sends_lease_id() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/sys/leases/renew"))
            .and(body_json(json!({"lease_id": "lease-1", "increment": 60})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lease_id": "lease-1",
                "lease_duration": 60
            })))
            .mount(&server)
            .await;

        let lease =
            renew_db_lease(&server.uri(), &SecretString::from("token"), "lease-1", 60).await?;
        assert_eq!(lease, 60);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_signals_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        keep_renewing("token", || async { Err(anyhow!("vault sealed")) }, tx).await;

        assert_eq!(rx.recv().await, Some(()));
    }

    #[tokio::test]
    async fn non_expiring_lease_stops_quietly() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        keep_renewing("token", || async { Ok(0) }, tx).await;

        // sender dropped without a shutdown signal
        assert_eq!(rx.recv().await, None);
    }
}
