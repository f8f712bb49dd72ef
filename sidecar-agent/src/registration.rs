//! Registration bootstrap: retries `POST /sync/register` every 10 s,
//! ignoring all other work, until the backend accepts this hostname.

use std::time::Duration;

use tokio::time::sleep;

use crate::client::BackendClient;

const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Block until registration succeeds, returning the assigned `proxy_id`.
///
/// `prior_proxy_id`, when set, is carried on every attempt so a
/// re-registration (e.g. after a reconnect) asserts the same identity
/// rather than colliding with the still-online prior record.
pub async fn register_until_success(
    client: &BackendClient,
    hostname: &str,
    prior_proxy_id: Option<&str>,
) -> String {
    loop {
        match client.register(hostname, prior_proxy_id).await {
            Ok(response) => {
                tracing::info!(proxy_id = %response.proxy_id, hostname, "registered");
                return response.proxy_id;
            }
            Err(error) => {
                tracing::warn!(%error, hostname, "registration failed, retrying");
                sleep(RETRY_INTERVAL).await;
            }
        }
    }
}
