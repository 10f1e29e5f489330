//! Error types for the probe

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Server failed to start: {0}")]
    Spawn(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Server closed its output stream")]
    Closed,

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
