//! # note2tex
//!
//! Convert wiki-linked Markdown notes into complete LaTeX documents.
//!
//! A note goes through four line stages (Markdown, equations, tables,
//! references), then embedded `![[…]]` references are spliced in from
//! the document store and the result is wrapped in a preamble and
//! bibliography.
//!
//! ## Quick Start
//!
//! ```
//! use note2tex::{convert_str, Settings};
//!
//! let settings = Settings::default().with_table_of_contents(false);
//! let latex = convert_str("# Results\nSee [[p3]] and $x^2$.", &settings);
//!
//! assert!(latex.contains("\\section{Results}"));
//! assert!(latex.contains("\\cite{p3}"));
//! assert!(latex.contains("\\(x^2\\)"));
//! ```
//!
//! ## Features
//!
//! - **Markdown**: headings, lists, emphasis, links, comments, escaping
//! - **Math**: numbered `$$` equations with labels, `aligned` → `split`
//! - **Tables**: `tabularx`, `longtable` or `tabular`
//! - **References**: citations, cross-references, block embeds and
//!   `!ref{…}` inclusion of equation, table and figure blocks
//! - **Parallel batches**: independent notes convert on Rayon threads

pub mod assemble;
pub mod convert;
pub mod embed;
pub mod error;
pub mod label;
pub mod settings;
pub mod stage;
pub mod store;

// Re-export commonly used types
pub use assemble::LatexAssembler;
pub use convert::{
    CompileOutcome, Compiler, ConversionStats, ConvertResult, Converter, LatexCompiler, Rendered,
};
pub use embed::{EmbedResolver, EmbeddedReference, ResolveReport};
pub use error::{Error, Result};
pub use label::{is_citation, normalize_label, BlockKind};
pub use settings::{Settings, TableAlignment, TablePackage};
pub use store::{DocumentStore, FsStore, MemoryStore};

use std::path::Path;

/// Convert Markdown text to a LaTeX document.
///
/// Nothing is read or written: embeds and inclusions stay unresolved.
pub fn convert_str(markdown: &str, settings: &Settings) -> String {
    let store = MemoryStore::new();
    Converter::new(&store, settings)
        .render(markdown, "")
        .content
}

/// Convert a note inside a vault directory and write its `.tex` file.
///
/// `note` is relative to `vault`.
///
/// # Example
///
/// ```no_run
/// use note2tex::{convert_file, Settings};
///
/// let result = convert_file("/home/me/vault", "Papers/Draft.md", &Settings::default()).unwrap();
/// println!("wrote {}", result.output_path);
/// ```
pub fn convert_file<P: AsRef<Path>>(vault: P, note: &str, settings: &Settings) -> Result<ConvertResult> {
    let store = FsStore::new(vault.as_ref());
    let compiler = LatexCompiler::from_settings(settings);
    Converter::new(&store, settings)
        .with_compiler(&compiler)
        .convert_note(note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_str_is_complete_document() {
        let latex = convert_str("text", &Settings::default());
        assert!(latex.starts_with("\\documentclass"));
        assert!(latex.contains("\\begin{document}"));
        assert!(latex.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn test_convert_str_keeps_unresolved_embeds() {
        let latex = convert_str("![[Missing]]", &Settings::default());
        assert!(latex.contains("![[Missing]]"));
    }

    #[test]
    fn test_convert_file_missing_note() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_file(dir.path(), "absent.md", &Settings::default()).unwrap_err();
        assert!(err.is_not_found());
    }
}
