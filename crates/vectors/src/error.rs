//! Error types for the vector store client

use thiserror::Error;

/// Why a vector store operation failed
///
/// An empty result is never an error; these variants only describe
/// failures, each with the reason the service or transport gave.
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Collection already exists: {0}")]
    AlreadyExists(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VectorError {
    /// True when the service could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, VectorError>;
