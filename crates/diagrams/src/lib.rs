//! Diagram extraction from Markdown documents
//!
//! Pulls every ```` ```mermaid ```` fenced block out of a document into its
//! own source file so it can be rendered separately, and produces the
//! `mmdc` command lines that render them.

mod error;
mod extract;
mod render;

pub use error::{DiagramError, Result};
pub use extract::{
    extract_diagrams, output_path, DiagramBlock, ExtractOptions, FencePattern, DEFAULT_EXTENSION,
    DEFAULT_OUTPUT_DIR, DEFAULT_TAG,
};
pub use render::{render_command, svg_path, RENDERER};
