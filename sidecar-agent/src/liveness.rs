//! Connectivity monitor: pings `/health` every 10 s and tracks a boolean
//! `connected` flag independent of the (longer) sync interval.
//!
//! On the offline→online transition the agent re-registers before
//! reporting itself connected again, so the sync loop never resumes
//! against a backend that has forgotten this hostname.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;

use crate::client::BackendClient;
use crate::registration;

const PING_INTERVAL: Duration = Duration::from_secs(10);

/// Run the liveness monitor forever, publishing transitions on `connected`.
///
/// `proxy_id` is shared with the registration bootstrap so a reconnect
/// re-registration asserts the same identity the agent was first assigned.
pub async fn run(
    client: BackendClient,
    hostname: String,
    proxy_id: Arc<Mutex<String>>,
    connected: watch::Sender<bool>,
) -> ! {
    let mut ticker = interval(PING_INTERVAL);
    let mut was_connected = *connected.borrow();
    loop {
        ticker.tick().await;
        let healthy = client.health().await.is_ok();

        if healthy && !was_connected {
            let prior = proxy_id.lock().expect("proxy id mutex poisoned").clone();
            let assigned =
                registration::register_until_success(&client, &hostname, Some(&prior)).await;
            *proxy_id.lock().expect("proxy id mutex poisoned") = assigned;
            tracing::info!(hostname, "connectivity restored, re-registered");
        } else if !healthy && was_connected {
            tracing::warn!(hostname, "connectivity lost, pausing sync loop");
        }

        was_connected = healthy;
        let _ = connected.send(healthy);
    }
}
