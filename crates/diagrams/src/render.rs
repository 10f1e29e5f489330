//! Render hints for extracted diagrams

use std::path::{Path, PathBuf};

/// Mermaid CLI executable
pub const RENDERER: &str = "mmdc";

/// Target image for a diagram source file: same stem, `.svg` extension
pub fn svg_path(diagram: &Path) -> PathBuf {
    diagram.with_extension("svg")
}

/// Shell command that renders `diagram` to SVG with a transparent background
pub fn render_command(diagram: &Path) -> String {
    format!(
        "{} -i {} -o {} --theme default --backgroundColor transparent",
        RENDERER,
        diagram.display(),
        svg_path(diagram).display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command() {
        let path = Path::new("docs/assets/diagrams/mermaid/design-diagram-1.mmd");
        assert_eq!(
            render_command(path),
            "mmdc -i docs/assets/diagrams/mermaid/design-diagram-1.mmd \
             -o docs/assets/diagrams/mermaid/design-diagram-1.svg \
             --theme default --backgroundColor transparent"
        );
    }

    #[test]
    fn test_svg_path_only_touches_extension() {
        // A ".mmd" inside a directory name is left alone
        let path = Path::new("out.mmd/flow-diagram-2.mmd");
        assert_eq!(svg_path(path), PathBuf::from("out.mmd/flow-diagram-2.svg"));
    }
}
