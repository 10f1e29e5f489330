//! The probe's request sequence
//!
//! `initialize` → `tools/list` → `tools/call`, one request in flight at a
//! time, ids 1, 2, 3 in order. A failed `initialize` ends the run before
//! anything else is sent.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use crate::config::DEFAULT_PROTOCOL_VERSION;
use crate::error::Result;
use crate::protocol::{
    Error as RpcError, InitializeParams, InitializeResult, Request, Response, ToolCallParams,
    ToolCallResult, ToolDescriptor, ToolsListResult,
};
use crate::transport::LineTransport;

/// Steps that can end a run early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Initialize,
    ListTools,
    CallTool,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Initialize => write!(f, "initialize"),
            Step::ListTools => write!(f, "tools/list"),
            Step::CallTool => write!(f, "tools/call"),
        }
    }
}

/// Outcome of invoking the first discovered tool
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub tool: String,
    pub success: bool,
    /// Text of the first content item, untruncated
    pub text: Option<String>,
    /// Error object, if the server returned one
    pub error: Option<RpcError>,
}

/// What the probe learned about the server
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    /// Present once `initialize` succeeded
    pub server: Option<InitializeResult>,
    /// Error returned instead of an `initialize` result
    pub initialize_error: Option<RpcError>,
    /// Whether `tools/list` produced a result
    pub tools_listed: bool,
    pub tools: Vec<ToolDescriptor>,
    pub tool_call: Option<ToolCallOutcome>,
    /// Step at which the run stopped, if it did not reach the end
    pub stopped_at: Option<Step>,
}

impl ProbeReport {
    pub fn initialized(&self) -> bool {
        self.server.is_some()
    }
}

/// A JSON-RPC conversation with one server
pub struct Session<R, W> {
    transport: LineTransport<R, W>,
    protocol_version: String,
    next_id: u64,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(transport: LineTransport<R, W>) -> Self {
        Self {
            transport,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            next_id: 1,
        }
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    async fn request<P: Serialize>(&mut self, method: &str, params: P) -> Result<Response> {
        let id = self.next_id;
        self.next_id += 1;
        let request = Request::new(id, method, params)?;
        self.transport.call(&request).await
    }

    /// Send `initialize` with an empty capability set
    pub async fn initialize(&mut self) -> Result<Response> {
        let version = self.protocol_version.clone();
        let params = InitializeParams {
            protocol_version: &version,
            capabilities: serde_json::Map::new(),
        };
        self.request("initialize", params).await
    }

    pub async fn list_tools(&mut self) -> Result<Response> {
        self.request("tools/list", serde_json::json!({})).await
    }

    /// Invoke `name` with no arguments
    pub async fn call_tool(&mut self, name: &str) -> Result<Response> {
        let params = ToolCallParams {
            name,
            arguments: serde_json::Map::new(),
        };
        self.request("tools/call", params).await
    }

    /// Run the full sequence
    ///
    /// Transport failures (timeout, closed stream, I/O) are returned as
    /// errors; protocol-level failures are recorded in the report.
    pub async fn run(mut self) -> Result<ProbeReport> {
        let mut report = ProbeReport::default();

        let response = self.initialize().await?;
        let Some(result) = response.result() else {
            warn!("initialize returned no result, stopping");
            report.initialize_error = response.error;
            report.stopped_at = Some(Step::Initialize);
            return Ok(report);
        };
        let server = match serde_json::from_value::<InitializeResult>(result.clone()) {
            Ok(server) => server,
            Err(e) => {
                warn!("Unexpected initialize result, ignoring server info: {}", e);
                InitializeResult::default()
            }
        };
        info!(
            "Initialized server {} v{}",
            server.server_info.name.as_deref().unwrap_or("unknown"),
            server.server_info.version.as_deref().unwrap_or("unknown")
        );
        report.server = Some(server);

        let response = self.list_tools().await?;
        let Some(result) = response.result() else {
            warn!("tools/list returned no result");
            report.stopped_at = Some(Step::ListTools);
            return Ok(report);
        };
        let listed = match serde_json::from_value::<ToolsListResult>(result.clone()) {
            Ok(listed) => listed,
            Err(e) => {
                warn!("Unexpected tools/list result, treating as no tools: {}", e);
                ToolsListResult::default()
            }
        };
        report.tools_listed = true;
        report.tools = listed.tools;
        info!("Discovered {} tools", report.tools.len());

        let Some(first) = report.tools.first() else {
            return Ok(report);
        };
        let tool = match &first.name {
            Some(name) => name.clone(),
            None => {
                warn!("First tool has no name, calling it with an empty name");
                String::new()
            }
        };

        let response = self.call_tool(&tool).await?;
        let success = response.is_success();
        let text = match response.result().map(|r| serde_json::from_value::<ToolCallResult>(r.clone())) {
            Some(Ok(result)) => result.first_text().map(str::to_string),
            Some(Err(e)) => {
                warn!("Unexpected tools/call result, no preview: {}", e);
                None
            }
            None => None,
        };
        if !success {
            report.stopped_at = Some(Step::CallTool);
        }
        report.tool_call = Some(ToolCallOutcome {
            tool,
            success,
            text,
            error: response.error,
        });

        Ok(report)
    }
}
