//! Wrapper around Traffic Server's `traffic_ctl` control tool.
//!
//! The agent never touches the proxy process directly; every interaction
//! with the running proxy is a `traffic_ctl` invocation shelled out via
//! [`tokio::process::Command`].

use tokio::process::Command;

use crate::error::{AgentError, AgentResult};

const TRAFFIC_CTL: &str = "traffic_ctl";

/// Counter names this agent scrapes, mapped to the control plane's
/// 16-field stats record.
const ACTIVE_CONNECTIONS_METRIC: &str = "proxy.process.http.current_client_connections";
const TOTAL_CONNECTIONS_METRIC: &str = "proxy.process.http.total_client_connections";
const CACHE_HITS_METRIC: &str = "proxy.process.http.cache_total_hits";
const CACHE_MISSES_METRIC: &str = "proxy.process.http.cache_total_misses";
const ERRORS_METRIC: &str = "proxy.process.http.total_server_errors";
const TOTAL_REQUESTS_METRIC: &str = "proxy.process.http.incoming_requests";
const CONNECT_REQUESTS_METRIC: &str = "proxy.process.http.total_server_connections";
const RESPONSES_2XX_METRIC: &str = "proxy.process.http.2xx_responses";
const RESPONSES_3XX_METRIC: &str = "proxy.process.http.3xx_responses";
const RESPONSES_4XX_METRIC: &str = "proxy.process.http.4xx_responses";
const RESPONSES_5XX_METRIC: &str = "proxy.process.http.5xx_responses";
const ERR_CONNECT_FAIL_METRIC: &str = "proxy.process.http.origin_connections_failed";
const ERR_CLIENT_ABORT_METRIC: &str = "proxy.process.http.err_client_abort_count_stat";
const BROKEN_SERVER_CONNS_METRIC: &str = "proxy.process.http.broken_server_connections";
const BYTES_IN_METRIC: &str = "proxy.process.http.user_agent_request_document_total_size";
const BYTES_OUT_METRIC: &str = "proxy.process.http.user_agent_response_document_total_size";

/// A counter sample scraped from the proxy, ready to fill a `StatsRequest`.
///
/// All fields are int64, except `active_connections`, which is a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    pub active_connections: i64,
    pub total_connections: i64,
    pub cache_hits: i64,
    pub cache_misses: i64,
    pub errors: i64,
    pub total_requests: i64,
    pub connect_requests: i64,
    pub responses_2xx: i64,
    pub responses_3xx: i64,
    pub responses_4xx: i64,
    pub responses_5xx: i64,
    pub err_connect_fail: i64,
    pub err_client_abort: i64,
    pub broken_server_conns: i64,
    pub bytes_in: i64,
    pub bytes_out: i64,
}

async fn run(args: &[&str]) -> AgentResult<String> {
    let output = Command::new(TRAFFIC_CTL)
        .args(args)
        .output()
        .await
        .map_err(|error| AgentError::ProxyControl(format!("spawn {TRAFFIC_CTL}: {error}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AgentError::ProxyControl(format!(
            "{TRAFFIC_CTL} {args:?} exited with {status}: {stderr}",
            status = output.status,
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|error| AgentError::ProxyControl(format!("non-utf8 output: {error}")))
}

/// Trigger `traffic_ctl config reload` after new config files have been
/// written to the proxy's config directory.
pub async fn reload() -> AgentResult<()> {
    run(&["config", "reload"]).await?;
    Ok(())
}

/// Enable or disable the proxy's diagnostic debug toggle.
pub async fn set_debug_enabled(enabled: bool) -> AgentResult<()> {
    let value = if enabled { "1" } else { "0" };
    run(&["config", "set", "proxy.config.diags.debug.enabled", value]).await?;
    Ok(())
}

/// Scrape the counters this agent reports, treating any counter the proxy
/// doesn't expose as zero.
pub async fn scrape_counters() -> AgentResult<CounterSample> {
    Ok(CounterSample {
        active_connections: get_counter(ACTIVE_CONNECTIONS_METRIC).await?,
        total_connections: get_counter(TOTAL_CONNECTIONS_METRIC).await?,
        cache_hits: get_counter(CACHE_HITS_METRIC).await?,
        cache_misses: get_counter(CACHE_MISSES_METRIC).await?,
        errors: get_counter(ERRORS_METRIC).await?,
        total_requests: get_counter(TOTAL_REQUESTS_METRIC).await?,
        connect_requests: get_counter(CONNECT_REQUESTS_METRIC).await?,
        responses_2xx: get_counter(RESPONSES_2XX_METRIC).await?,
        responses_3xx: get_counter(RESPONSES_3XX_METRIC).await?,
        responses_4xx: get_counter(RESPONSES_4XX_METRIC).await?,
        responses_5xx: get_counter(RESPONSES_5XX_METRIC).await?,
        err_connect_fail: get_counter(ERR_CONNECT_FAIL_METRIC).await?,
        err_client_abort: get_counter(ERR_CLIENT_ABORT_METRIC).await?,
        broken_server_conns: get_counter(BROKEN_SERVER_CONNS_METRIC).await?,
        bytes_in: get_counter(BYTES_IN_METRIC).await?,
        bytes_out: get_counter(BYTES_OUT_METRIC).await?,
    })
}

async fn get_counter(name: &str) -> AgentResult<i64> {
    match run(&["metric", "get", name]).await {
        Ok(output) => Ok(parse_metric_value(&output).unwrap_or(0)),
        Err(_) => Ok(0),
    }
}

/// Parse `traffic_ctl metric get`'s `name N` output line into its integer
/// value.
fn parse_metric_value(output: &str) -> Option<i64> {
    output.split_whitespace().last()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_value_from_name_value_line() {
        assert_eq!(
            parse_metric_value("proxy.process.http.incoming_requests 42\n"),
            Some(42)
        );
    }

    #[test]
    fn missing_or_malformed_output_yields_none() {
        assert_eq!(parse_metric_value(""), None);
        assert_eq!(parse_metric_value("not-a-number"), None);
    }
}
