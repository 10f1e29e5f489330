//! Probe: manual conformance check for JSON-RPC tool servers
//!
//! Launches a server as a subprocess and talks line-delimited JSON-RPC 2.0
//! to it over stdin/stdout:
//!
//! ```text
//! spawn → settle → initialize → tools/list → tools/call → teardown
//! ```
//!
//! Teardown runs whichever step failed. The server's stderr is forwarded to
//! the log rather than mixed into the protocol stream.
//!
//! # Usage
//!
//! ```rust,ignore
//! use probe::{run_probe, ProbeConfig};
//!
//! let config = ProbeConfig::for_command("./my-server", vec!["serve".into()]);
//! let report = run_probe(&config).await?;
//! println!("{} tools", report.tools.len());
//! ```

pub mod config;
pub mod error;
pub mod process;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::ProbeConfig;
pub use error::{ProbeError, Result};
pub use process::ServerProcess;
pub use protocol::{Request, RequestId, Response, ServerInfo, ToolDescriptor};
pub use session::{ProbeReport, Session, Step, ToolCallOutcome};
pub use transport::LineTransport;

/// Run the whole probe against the configured server
pub async fn run_probe(config: &ProbeConfig) -> Result<ProbeReport> {
    let mut server = ServerProcess::spawn(&config.command, &config.args)?;

    let transport = match server.transport() {
        Ok(transport) => transport
            .with_log_prefix(config.log_prefix.clone())
            .with_timeout(config.response_timeout()),
        Err(e) => {
            server.shutdown(config.shutdown_timeout()).await;
            return Err(e);
        }
    };

    let outcome = match server.settle(config.settle()).await {
        Ok(()) => {
            Session::new(transport)
                .with_protocol_version(config.protocol_version.clone())
                .run()
                .await
        }
        Err(e) => Err(e),
    };

    server.shutdown(config.shutdown_timeout()).await;
    outcome
}
