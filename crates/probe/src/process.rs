//! Server process lifecycle
//!
//! Spawns the server under test with piped stdio, keeps its stderr on a
//! separate channel forwarded to the log, and tears it down with a bounded
//! graceful wait before escalating to a kill.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProbeError, Result};
use crate::transport::LineTransport;

/// Transport bound to a child's stdout/stdin
pub type ChildTransport = LineTransport<BufReader<ChildStdout>, ChildStdin>;

/// A running server under test
pub struct ServerProcess {
    process: Child,
    /// Signalled whenever the server writes a diagnostic line
    ready: Arc<Notify>,
    stderr_task: Option<JoinHandle<()>>,
}

impl ServerProcess {
    /// Spawn `program` with `args`, all three standard streams piped
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        info!("Spawning server: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Releases the child if the probe unwinds before teardown
        cmd.kill_on_drop(true);

        let mut process = cmd
            .spawn()
            .map_err(|e| ProbeError::Spawn(format!("Failed to spawn {}: {}", program, e)))?;

        let stderr = process
            .stderr
            .take()
            .ok_or_else(|| ProbeError::Spawn("Failed to get stderr".to_string()))?;

        let ready = Arc::new(Notify::new());
        let ready_clone = ready.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "probe::server", "{}", line);
                ready_clone.notify_one();
            }
        });

        Ok(Self {
            process,
            ready,
            stderr_task: Some(stderr_task),
        })
    }

    /// OS process id, if the process has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Take the child's stdin/stdout as a JSON-RPC transport
    ///
    /// Can only be called once.
    pub fn transport(&mut self) -> Result<ChildTransport> {
        let stdin = self
            .process
            .stdin
            .take()
            .ok_or_else(|| ProbeError::Spawn("Failed to get stdin".to_string()))?;
        let stdout = self
            .process
            .stdout
            .take()
            .ok_or_else(|| ProbeError::Spawn("Failed to get stdout".to_string()))?;

        Ok(LineTransport::new(BufReader::new(stdout), stdin))
    }

    /// Wait for the server to come up
    ///
    /// Returns on the server's first diagnostic line or once `max_wait`
    /// elapses, whichever comes first. Fails if the process exits meanwhile.
    pub async fn settle(&mut self, max_wait: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(max_wait) => {
                debug!("Settle period of {:?} elapsed", max_wait);
                Ok(())
            }
            _ = self.ready.notified() => {
                debug!("Server reported activity, treating as ready");
                Ok(())
            }
            status = self.process.wait() => {
                let status = status?;
                Err(ProbeError::Spawn(format!("Server exited during startup: {}", status)))
            }
        }
    }

    /// Stop the server: terminate, wait up to `grace`, then kill
    ///
    /// Failures are logged, never returned.
    pub async fn shutdown(mut self, grace: Duration) {
        match self.process.try_wait() {
            Ok(Some(status)) => {
                debug!("Server already exited: {}", status);
                self.finish();
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to query server status: {}", e),
        }

        self.terminate();

        match tokio::time::timeout(grace, self.process.wait()).await {
            Ok(Ok(status)) => info!("Server stopped: {}", status),
            Ok(Err(e)) => warn!("Failed to wait for server: {}", e),
            Err(_) => {
                warn!("Server did not stop within {:?}, killing", grace);
                if let Err(e) = self.process.kill().await {
                    warn!("Failed to kill server: {}", e);
                }
            }
        }

        self.finish();
    }

    #[cfg(unix)]
    fn terminate(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.process.id() else {
            return;
        };
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!("Failed to send SIGTERM to server {}: {}", pid, e);
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        if let Err(e) = self.process.start_kill() {
            warn!("Failed to stop server: {}", e);
        }
    }

    fn finish(&mut self) {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}
