//! Error type shared across the agent's tasks.

use std::path::PathBuf;

/// Failure modes the agent can hit while talking to the backend, the proxy's
/// control tool, or its own config directory.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The backend rejected or failed to answer an HTTP call.
    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),
    /// The backend returned a status this agent has no retry strategy for.
    #[error("backend returned unexpected status {status} for {operation}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: reqwest::StatusCode,
        /// Name of the call that received it, for logging.
        operation: &'static str,
    },
    /// Reading or writing a file under the config directory failed.
    #[error("config directory I/O failed at {path}: {source}")]
    ConfigIo {
        /// Path of the file being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Invoking the proxy's control tool failed or it reported an error.
    #[error("traffic_ctl invocation failed: {0}")]
    ProxyControl(String),
}

/// Convenience alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
