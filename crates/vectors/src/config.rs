//! Vector store connection settings

use serde::{Deserialize, Serialize};

/// Default service endpoint
pub const DEFAULT_URL: &str = "http://localhost:6333";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Base URL of the service
    pub url: String,
    /// Request timeout in seconds; the HTTP library default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl VectorStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}
