//! Error types for diagram extraction

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("File {} not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid fence tag: {0}")]
    InvalidTag(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DiagramError>;
