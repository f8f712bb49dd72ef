//! Thin HTTP client for the control plane's sync protocol.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::{AgentError, AgentResult};
use crate::wire::{
    AckRequest, HealthResponse, LogsRequest, LogsResponse, PollResponse, RegisterRequest,
    RegisterResponse, StatsRequest,
};

const SECRET_HEADER: &str = "x-fleet-sync-secret";
const SHORT_TIMEOUT: Duration = Duration::from_secs(4);
const LONG_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend sync-protocol client, shared across the agent's tasks.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    shared_secret: Option<String>,
}

impl BackendClient {
    /// Build a client targeting `base_url`, optionally authenticating sync
    /// calls with a shared secret header.
    #[must_use]
    pub fn new(base_url: String, shared_secret: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            shared_secret,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.shared_secret {
            Some(secret) => builder.header(SECRET_HEADER, secret),
            None => builder,
        }
    }

    /// `GET /api/v1/health`, 4 s timeout.
    pub async fn health(&self) -> AgentResult<HealthResponse> {
        let response = self
            .request(self.http.get(self.url("/api/v1/health")))
            .timeout(SHORT_TIMEOUT)
            .send()
            .await?;
        ok_json(response, "health").await
    }

    /// `POST /api/v1/sync/register`, 4 s timeout.
    pub async fn register(
        &self,
        hostname: &str,
        proxy_id: Option<&str>,
    ) -> AgentResult<RegisterResponse> {
        let response = self
            .request(self.http.post(self.url("/api/v1/sync/register")))
            .timeout(SHORT_TIMEOUT)
            .json(&RegisterRequest {
                hostname: hostname.to_owned(),
                proxy_id: proxy_id.map(ToOwned::to_owned),
            })
            .send()
            .await?;
        ok_json(response, "register").await
    }

    /// `GET /api/v1/sync?hostname=&hash=`, 30 s timeout.
    pub async fn poll(&self, hostname: &str, hash: Option<&str>) -> AgentResult<PollResponse> {
        let mut request = self
            .request(self.http.get(self.url("/api/v1/sync")))
            .timeout(LONG_TIMEOUT)
            .query(&[("hostname", hostname)]);
        if let Some(hash) = hash {
            request = request.query(&[("hash", hash)]);
        }
        let response = request.send().await?;
        ok_json(response, "poll").await
    }

    /// `POST /api/v1/sync/ack`, 30 s timeout.
    pub async fn ack(&self, request: &AckRequest) -> AgentResult<()> {
        let response = self
            .request(self.http.post(self.url("/api/v1/sync/ack")))
            .timeout(LONG_TIMEOUT)
            .json(request)
            .send()
            .await?;
        ok_no_content(response, "ack").await
    }

    /// `POST /api/v1/sync/stats`, 30 s timeout.
    pub async fn push_stats(&self, request: &StatsRequest) -> AgentResult<()> {
        let response = self
            .request(self.http.post(self.url("/api/v1/sync/stats")))
            .timeout(LONG_TIMEOUT)
            .json(request)
            .send()
            .await?;
        ok_no_content(response, "push_stats").await
    }

    /// `POST /api/v1/sync/logs`, 30 s timeout.
    pub async fn push_logs(&self, request: &LogsRequest) -> AgentResult<LogsResponse> {
        let response = self
            .request(self.http.post(self.url("/api/v1/sync/logs")))
            .timeout(LONG_TIMEOUT)
            .json(request)
            .send()
            .await?;
        ok_json(response, "push_logs").await
    }
}

/// Whether a poll response carried a 404, meaning the hostname is unknown to
/// the server and the agent must re-register.
#[must_use]
pub fn is_not_found(error: &AgentError) -> bool {
    matches!(
        error,
        AgentError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            ..
        }
    )
}

async fn ok_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation: &'static str,
) -> AgentResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::UnexpectedStatus { status, operation });
    }
    Ok(response.json().await?)
}

async fn ok_no_content(response: reqwest::Response, operation: &'static str) -> AgentResult<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::UnexpectedStatus { status, operation });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::wire::AckStatus;

    #[tokio::test]
    async fn register_sends_hostname_and_parses_proxy_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sync/register"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "proxyId": "proxy-1" })),
            )
            .mount(&server)
            .await;
        let client = BackendClient::new(server.uri(), None);

        let response = client.register("edge-1.example.com", None).await.unwrap();

        assert_eq!(response.proxy_id, "proxy-1");
    }

    #[tokio::test]
    async fn requests_carry_the_shared_secret_header_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/health"))
            .and(header(SECRET_HEADER, "topsecret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "serverTime": chrono::Utc::now(),
            })))
            .mount(&server)
            .await;
        let client = BackendClient::new(server.uri(), Some("topsecret".to_owned()));

        client.health().await.unwrap();
    }

    #[tokio::test]
    async fn poll_forwards_hostname_and_hash_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sync"))
            .and(query_param("hostname", "edge-1.example.com"))
            .and(query_param("hash", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "unchanged": true,
                "hash": null,
                "config": null,
                "captureLogs": false,
                "captureUntil": null,
            })))
            .mount(&server)
            .await;
        let client = BackendClient::new(server.uri(), None);

        let response = client
            .poll("edge-1.example.com", Some("abc123"))
            .await
            .unwrap();

        assert!(response.unchanged);
        assert!(response.hash.is_none());
    }

    #[tokio::test]
    async fn ack_reports_not_found_when_the_proxy_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sync/ack"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = BackendClient::new(server.uri(), None);

        let error = client
            .ack(&AckRequest {
                hostname: "edge-1.example.com".to_owned(),
                hash: "abc123".to_owned(),
                status: AckStatus::Ok,
                message: None,
            })
            .await
            .unwrap_err();

        assert!(is_not_found(&error));
    }

    #[tokio::test]
    async fn push_stats_surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sync/stats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = BackendClient::new(server.uri(), None);

        let error = client
            .push_stats(&StatsRequest {
                hostname: "edge-1.example.com".to_owned(),
                captured_at: chrono::Utc::now(),
                active_connections: 0,
                total_connections: 1,
                cache_hits: 0,
                cache_misses: 0,
                errors: 0,
                total_requests: 1,
                connect_requests: 0,
                responses_2xx: 0,
                responses_3xx: 0,
                responses_4xx: 0,
                responses_5xx: 0,
                err_connect_fail: 0,
                err_client_abort: 0,
                broken_server_conns: 0,
                bytes_in: 0,
                bytes_out: 2,
            })
            .await
            .unwrap_err();

        assert!(!is_not_found(&error));
    }
}
