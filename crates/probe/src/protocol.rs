//! JSON-RPC 2.0 message types
//!
//! Newline-delimited messages exchanged with the server under test.

use serde::{Deserialize, Serialize};

/// Protocol tag carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier, numeric or string on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

/// A request to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    /// Method parameters as a JSON object
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    /// Create a request with the given id and parameters
    pub fn new(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: serde_json::to_value(params)?,
        })
    }
}

/// A response from the server
///
/// Only `result` and `error` are inspected; everything else the server
/// sends is tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Null for errors the server could not attribute to a request
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl Response {
    /// The result payload, if the server sent a non-null one
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref().filter(|v| !v.is_null())
    }

    /// Check if this response carries a usable result
    pub fn is_success(&self) -> bool {
        self.result().is_some()
    }
}

/// Error object in a response
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct Error {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Error {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Server identity reported by `initialize`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for `initialize`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams<'a> {
    pub protocol_version: &'a str,
    pub capabilities: serde_json::Map<String, serde_json::Value>,
}

/// The parts of an `initialize` result the probe reports
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub server_info: ServerInfo,
}

/// A tool advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of `tools/list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Parameters for `tools/call`
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams<'a> {
    pub name: &'a str,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// One content item in a `tools/call` result
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

impl ToolCallResult {
    /// Text of the first content item, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|c| c.text.as_deref())
    }
}
