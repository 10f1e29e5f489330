//! Probe configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_LOG_PREFIX;

/// MCP protocol revision sent in `initialize`
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// How to launch and talk to the server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Executable to launch
    pub command: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Protocol version announced during `initialize`
    pub protocol_version: String,
    /// Prefix of server log lines that share stdout with protocol frames
    pub log_prefix: String,
    /// Upper bound on the startup wait
    pub settle_ms: u64,
    /// Upper bound on the wait for each response
    pub response_timeout_ms: u64,
    /// Grace period between SIGTERM and a forced kill
    pub shutdown_timeout_ms: u64,
    /// Number of discovered tools listed in the report
    pub tool_preview_count: usize,
    /// Tool descriptions are cut to this many characters
    pub description_width: usize,
    /// Tool call output is cut to this many characters
    pub preview_width: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: "docker".to_string(),
            args: [
                "exec",
                "-i",
                "prompt-alchemy-mcp",
                "prompt-alchemy",
                "--config",
                "/app/config.yaml",
                "serve",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            settle_ms: 2000,
            response_timeout_ms: 30_000,
            shutdown_timeout_ms: 5000,
            tool_preview_count: 5,
            description_width: 80,
            preview_width: 200,
        }
    }
}

impl ProbeConfig {
    /// Config for an arbitrary command with default timings
    pub fn for_command(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Default::default()
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Command line as it would be typed in a shell
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
