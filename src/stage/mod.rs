//! Line-rewriting stages of the conversion pipeline.
//!
//! Each stage consumes the previous stage's lines and produces new ones.
//! The order is fixed: Markdown → Equation → Table → Reference.
//! A rendered region (an equation or a table) is emitted as a single
//! element that may span several physical lines.

mod equation;
mod inclusion;
mod markdown;
pub mod region;
mod reference;
mod table;

pub use equation::EquationStage;
pub use inclusion::{ContentKind, InclusionExpander, MAX_INCLUSION_DEPTH};
pub use markdown::{escape_prose, MarkdownStage};
pub use reference::ReferenceStage;
pub use table::{ColumnAlignment, TableSpec, TableStage};

/// A text-rewriting pipeline stage.
pub trait Stage {
    /// Stage name used in diagnostics.
    fn name(&self) -> &str;

    /// Rewrite the lines.
    fn process(&self, lines: Vec<String>) -> Vec<String>;
}

/// Split text into owned lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_keeps_blank_lines() {
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines(""), vec![""]);
    }
}
