//! Applying a polled configuration to the local config directory.
//!
//! Writes are atomic per file (`tmp` + rename); the fingerprint sentinel is
//! only updated after every file has landed and the proxy has reloaded
//! successfully, so a partial failure always leaves the directory in a
//! state the next poll will detect as divergent and retry.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AgentError, AgentResult};
use crate::proxy_ctl;
use crate::wire::PollResponse;

const SENTINEL_FILE: &str = ".config_hash";
const PARENT_CONFIG_FILE: &str = "parent.config";
const SNI_YAML_FILE: &str = "sni.yaml";
const IP_ALLOW_YAML_FILE: &str = "ip_allow.yaml";

fn config_io_error(path: &Path, source: std::io::Error) -> AgentError {
    AgentError::ConfigIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Read the locally applied fingerprint, if any sentinel file exists yet.
pub async fn read_sentinel(config_dir: &Path) -> AgentResult<Option<String>> {
    let path = config_dir.join(SENTINEL_FILE);
    match fs::read_to_string(&path).await {
        Ok(contents) => Ok(Some(contents.trim().to_owned())),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(config_io_error(&path, error)),
    }
}

async fn write_atomic(dir: &Path, name: &str, contents: &str) -> AgentResult<()> {
    let tmp_path = dir.join(format!("{name}.tmp"));
    let live_path = dir.join(name);
    fs::write(&tmp_path, contents)
        .await
        .map_err(|error| config_io_error(&tmp_path, error))?;
    fs::rename(&tmp_path, &live_path)
        .await
        .map_err(|error| config_io_error(&live_path, error))
}

/// Write every non-empty artefact in `response`, reload the proxy, and
/// persist the new fingerprint sentinel on success.
///
/// Returns the error message to acknowledge back to the server on any
/// failure; the sentinel is left untouched so the next poll retries.
pub async fn apply(config_dir: &Path, response: &PollResponse) -> Result<(), String> {
    apply_inner(config_dir, response)
        .await
        .map_err(|error| error.to_string())
}

async fn apply_inner(config_dir: &Path, response: &PollResponse) -> AgentResult<()> {
    if let Some(config) = response.config.as_ref() {
        if !config.parent_config.is_empty() {
            write_atomic(config_dir, PARENT_CONFIG_FILE, &config.parent_config).await?;
        }
        if !config.sni_yaml.is_empty() {
            write_atomic(config_dir, SNI_YAML_FILE, &config.sni_yaml).await?;
        }
        if !config.ip_allow_yaml.is_empty() {
            write_atomic(config_dir, IP_ALLOW_YAML_FILE, &config.ip_allow_yaml).await?;
        }
    }

    proxy_ctl::reload().await?;

    if let Some(hash) = response.hash.as_deref() {
        write_sentinel(config_dir, hash).await?;
    }
    Ok(())
}

async fn write_sentinel(config_dir: &Path, fingerprint: &str) -> AgentResult<()> {
    write_atomic(config_dir, SENTINEL_FILE, fingerprint).await
}

/// Convenience for composing the sentinel path in log messages.
#[must_use]
pub fn sentinel_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SENTINEL_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_sentinel_returns_none_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = read_sentinel(dir.path()).await.expect("read");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_atomic(dir.path(), "sni.yaml", "first")
            .await
            .expect("first write");
        write_atomic(dir.path(), "sni.yaml", "second")
            .await
            .expect("second write");
        let contents = tokio::fs::read_to_string(dir.path().join("sni.yaml"))
            .await
            .expect("read back");
        assert_eq!(contents, "second");
        assert!(!dir.path().join("sni.yaml.tmp").exists());
    }
}
