//! Line-delimited JSON-RPC transport
//!
//! Writes one request per line and reads lines back until one parses as a
//! JSON object. Blank lines, lines starting with the server's log prefix and
//! anything that is not JSON are treated as diagnostics and skipped.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::error::{ProbeError, Result};
use crate::protocol::{Request, Response};

/// Default prefix of structured log lines emitted by the server
pub const DEFAULT_LOG_PREFIX: &str = "time=";

/// Default time to wait for a single response
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC transport over a pair of byte streams
///
/// Generic over the streams so the same code drives a child process's pipes
/// or an in-memory transcript.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    log_prefix: String,
    timeout: Duration,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Lines starting with this prefix are skipped without a parse attempt
    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    /// Upper bound on the wait for each response
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serialize and send a request as a single line
    pub async fn send(&mut self, request: &Request) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        debug!("Sending: {}", line);
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Wait for the next response, bounded by the configured timeout
    pub async fn receive(&mut self) -> Result<Response> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.next_response()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }

    /// Send a request and read the response that follows it
    ///
    /// Responses are taken in arrival order. An id that does not match the
    /// request is logged but the response is still returned.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        let start = Instant::now();
        self.send(request).await?;
        let response = self.receive().await?;

        if response.id.as_ref() != Some(&request.id) {
            warn!(
                "Response id mismatch for {}: expected {}, got {:?}",
                request.method, request.id, response.id
            );
        }

        debug!(
            method = %request.method,
            elapsed_ms = start.elapsed().as_micros() as f64 / 1000.0,
            "Round trip complete"
        );
        Ok(response)
    }

    async fn next_response(&mut self) -> Result<Response> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = self.reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                return Err(ProbeError::Closed);
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(_) => {
                    debug!("Skipping non-UTF-8 line: {}", String::from_utf8_lossy(&buf).trim());
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self.log_prefix.is_empty() && trimmed.starts_with(&self.log_prefix) {
                trace!("Skipping log line: {}", trimmed);
                continue;
            }

            let value = match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(serde_json::Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    debug!("Skipping non-JSON line: {}", trimmed);
                    continue;
                }
            };

            // Server-initiated notifications are not answers to our request
            let is_notification = value.contains_key("method")
                && !value.contains_key("result")
                && !value.contains_key("error");
            if is_notification {
                debug!("Skipping server notification: {}", trimmed);
                continue;
            }

            debug!("Received: {}", trimmed);
            return Ok(serde_json::from_value(serde_json::Value::Object(value))?);
        }
    }
}
