//! Fenced block extraction
//!
//! Scans a whole document for ```` ```<tag> ```` fences and writes each
//! block's body to `<stem>-diagram-<n>.<ext>`, numbering from 1 in document
//! order. CRLF line endings are read as LF. Fences of the same tag do not
//! nest: an inner closing fence ends the outer block.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DiagramError, Result};

pub const DEFAULT_TAG: &str = "mermaid";
pub const DEFAULT_EXTENSION: &str = "mmd";
pub const DEFAULT_OUTPUT_DIR: &str = "docs/assets/diagrams/mermaid";

/// Where and what to extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub output_dir: PathBuf,
    /// Content-type tag following the opening fence
    pub tag: String,
    /// Extension of the written files, without the dot
    pub extension: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tag: DEFAULT_TAG.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// One extracted block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// 1-based position in the source document
    pub index: usize,
    pub content: String,
    pub path: PathBuf,
}

/// Compiled matcher for one fence tag
#[derive(Debug)]
pub struct FencePattern {
    regex: Regex,
}

static MERMAID_PATTERN: OnceLock<FencePattern> = OnceLock::new();

impl FencePattern {
    /// Build a matcher for ```` ```<tag> ```` fences
    pub fn new(tag: &str) -> Result<Self> {
        if tag.is_empty() || tag.chars().any(|c| c.is_whitespace() || c == '`') {
            return Err(DiagramError::InvalidTag(tag.to_string()));
        }
        let pattern = format!(r"(?s)```{}\n(.*?)\n```", regex::escape(tag));
        let regex = Regex::new(&pattern).map_err(|e| DiagramError::InvalidTag(e.to_string()))?;
        Ok(Self { regex })
    }

    /// The shared matcher for mermaid fences
    pub fn mermaid() -> &'static FencePattern {
        MERMAID_PATTERN.get_or_init(|| Self {
            regex: Regex::new(r"(?s)```mermaid\n(.*?)\n```").expect("mermaid regex must compile"),
        })
    }

    /// Bodies of all blocks, in document order
    pub fn find_blocks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }
}

/// Path of the `index`-th diagram extracted from `input`
pub fn output_path(input: &Path, index: usize, options: &ExtractOptions) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    options
        .output_dir
        .join(format!("{}-diagram-{}.{}", stem, index, options.extension))
}

/// Extract every fenced block of `input` into `options.output_dir`
///
/// The output directory is created if needed and existing files with the
/// same names are overwritten.
pub fn extract_diagrams(input: &Path, options: &ExtractOptions) -> Result<Vec<DiagramBlock>> {
    if !input.exists() {
        return Err(DiagramError::InputNotFound(input.to_path_buf()));
    }

    let owned;
    let pattern = if options.tag == DEFAULT_TAG {
        FencePattern::mermaid()
    } else {
        owned = FencePattern::new(&options.tag)?;
        &owned
    };

    fs::create_dir_all(&options.output_dir).map_err(|source| DiagramError::Io {
        path: options.output_dir.clone(),
        source,
    })?;

    let text = fs::read_to_string(input).map_err(|source| DiagramError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    // Windows line endings are read as plain newlines
    let text = text.replace("\r\n", "\n");

    let bodies = pattern.find_blocks(&text);
    debug!("Found {} {} blocks in {}", bodies.len(), options.tag, input.display());

    let mut blocks = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.into_iter().enumerate() {
        let index = i + 1;
        let path = output_path(input, index, options);
        fs::write(&path, body).map_err(|source| DiagramError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Extracted diagram {} to {}", index, path.display());

        blocks.push(DiagramBlock {
            index,
            content: body.to_string(),
            path,
        });
    }

    Ok(blocks)
}
