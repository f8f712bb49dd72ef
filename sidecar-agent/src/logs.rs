//! Time-boxed debug log capture.
//!
//! While a capture is active: the proxy's debug toggle is enabled, the
//! diagnostic log is tailed every 5 s, lines matching `Result for` or
//! `parent` are batched and pushed to the server, and the toggle is
//! disabled again on exit (deadline reached or task cancelled). Only one
//! capture task runs at a time; a poll that requests capture while one is
//! already running extends the running task's deadline instead of
//! starting a second one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;

use crate::client::BackendClient;
use crate::wire::{LogLineRequest, LogsRequest};

const TAIL_INTERVAL: Duration = Duration::from_secs(5);
const MATCH_SUBSTRINGS: [&str; 2] = ["Result for", "parent"];

/// Coordinates the single in-flight capture task, if any.
pub struct LogCapture {
    deadline_tx: watch::Sender<Option<DateTime<Utc>>>,
    running: Mutex<bool>,
}

impl LogCapture {
    /// Build an idle capture coordinator.
    #[must_use]
    pub fn new() -> Self {
        let (deadline_tx, _) = watch::channel(None);
        Self {
            deadline_tx,
            running: Mutex::new(false),
        }
    }

    /// Ensure a capture task is running bounded by `until`, extending the
    /// deadline of an already-running task rather than starting a second
    /// one.
    pub async fn request_until(
        self: &Arc<Self>,
        until: DateTime<Utc>,
        client: BackendClient,
        hostname: String,
        diagnostic_log_path: PathBuf,
    ) {
        let mut running = self.running.lock().await;
        if *running {
            self.deadline_tx.send_if_modified(|current| {
                let extended = current.is_none_or(|existing| until > existing);
                if extended {
                    *current = Some(until);
                }
                extended
            });
            return;
        }
        *running = true;
        drop(running);

        let _ = self.deadline_tx.send(Some(until));
        let capture = Arc::clone(self);
        tokio::spawn(async move {
            run_capture(&capture, client, hostname, diagnostic_log_path).await;
            *capture.running.lock().await = false;
        });
    }
}

impl Default for LogCapture {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_capture(
    capture: &Arc<LogCapture>,
    client: BackendClient,
    hostname: String,
    diagnostic_log_path: PathBuf,
) {
    if let Err(error) = crate::proxy_ctl::set_debug_enabled(true).await {
        tracing::warn!(%error, "failed to enable proxy debug toggle");
    }

    let mut rx = capture.deadline_tx.subscribe();
    let mut offset: u64 = tokio::fs::metadata(&diagnostic_log_path)
        .await
        .map(|metadata| metadata.len())
        .unwrap_or(0);
    let mut ticker = tokio::time::interval(TAIL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let Some(deadline) = *rx.borrow() else {
            break;
        };
        if Utc::now() >= deadline {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            result = rx.changed() => {
                if result.is_err() {
                    break;
                }
                continue;
            }
        }

        match tail_new_lines(&diagnostic_log_path, &mut offset).await {
            Ok(lines) if !lines.is_empty() => {
                let now = Utc::now();
                let request = LogsRequest {
                    hostname: hostname.clone(),
                    lines: lines
                        .into_iter()
                        .map(|text| LogLineRequest {
                            captured_at: now,
                            text,
                        })
                        .collect(),
                };
                match client.push_logs(&request).await {
                    Ok(response) if !response.continue_capture => break,
                    Ok(_) => {}
                    Err(error) => tracing::warn!(%error, "failed to push captured log lines"),
                }
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "failed to tail diagnostic log"),
        }
    }

    if let Err(error) = crate::proxy_ctl::set_debug_enabled(false).await {
        tracing::warn!(%error, "failed to disable proxy debug toggle");
    }
}

async fn tail_new_lines(
    path: &std::path::Path,
    offset: &mut u64,
) -> std::io::Result<Vec<String>> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };
    let len = file.metadata().await?.len();
    if len < *offset {
        // The log was rotated or truncated; restart from the top.
        *offset = 0;
    }
    file.seek(std::io::SeekFrom::Start(*offset)).await?;
    let mut buffer = String::new();
    file.read_to_string(&mut buffer).await?;
    *offset = len;

    Ok(buffer
        .lines()
        .filter(|line| MATCH_SUBSTRINGS.iter().any(|needle| line.contains(needle)))
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[tokio::test]
    async fn tail_new_lines_filters_and_advances_offset() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "noise line").expect("write");
        writeln!(file, "Result for proxy-01: ok").expect("write");
        file.flush().expect("flush");

        let mut offset = 0;
        let lines = tail_new_lines(file.path(), &mut offset)
            .await
            .expect("tail");
        assert_eq!(lines, vec!["Result for proxy-01: ok".to_owned()]);
        assert!(offset > 0);

        let lines_again = tail_new_lines(file.path(), &mut offset)
            .await
            .expect("tail again");
        assert!(lines_again.is_empty());
    }

    #[tokio::test]
    async fn tail_new_lines_treats_missing_file_as_empty() {
        let mut offset = 0;
        let lines = tail_new_lines(std::path::Path::new("/nonexistent/diags.log"), &mut offset)
            .await
            .expect("tail missing");
        assert!(lines.is_empty());
    }
}
