use anyhow::Result;
use std::fmt::Write;
use std::path::PathBuf;

use diagrams::{DiagramBlock, DiagramError, ExtractOptions};

pub struct ExtractArgs {
    pub input: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub tag: Option<String>,
    pub extension: Option<String>,
}

/// Flags win over the configured defaults
pub fn resolve_options(args: &ExtractArgs, defaults: &ExtractOptions) -> ExtractOptions {
    ExtractOptions {
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| defaults.output_dir.clone()),
        tag: args.tag.clone().unwrap_or_else(|| defaults.tag.clone()),
        extension: args
            .extension
            .clone()
            .unwrap_or_else(|| defaults.extension.clone()),
    }
}

pub fn handle_extract(args: ExtractArgs, defaults: &ExtractOptions) -> Result<()> {
    let options = resolve_options(&args, defaults);

    let blocks = match diagrams::extract_diagrams(&args.input, &options) {
        Ok(blocks) => blocks,
        Err(e @ DiagramError::InputNotFound(_)) => {
            println!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", format_summary(&blocks));
    Ok(())
}

/// Per-file lines, the total, then the render commands
pub fn format_summary(blocks: &[DiagramBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        let _ = writeln!(out, "Extracted diagram {} to {}", block.index, block.path.display());
    }
    let _ = writeln!(out, "\nExtracted {} diagrams", blocks.len());

    let _ = writeln!(out, "\nTo render these diagrams, run:");
    for block in blocks {
        let _ = writeln!(out, "{}", diagrams::render_command(&block.path));
    }
    out
}
