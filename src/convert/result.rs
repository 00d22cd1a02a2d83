//! Conversion results and statistics.

use super::compile::CompileOutcome;
use crate::embed::ResolveReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of the in-memory pipeline.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Complete LaTeX document
    pub content: String,

    /// Counts gathered from the converted body
    pub stats: ConversionStats,
}

/// Result of converting one note to a `.tex` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResult {
    /// Store path of the source note
    pub source: String,

    /// Store path of the written `.tex` file
    pub output_path: String,

    /// The written LaTeX
    #[serde(skip)]
    pub content: String,

    /// Conversion statistics
    pub stats: ConversionStats,

    /// Compiler outcome, when compilation ran
    pub compile: Option<CompileOutcome>,

    /// When the file was written
    pub converted_at: DateTime<Utc>,
}

impl ConvertResult {
    /// Get the content length in bytes.
    pub fn content_len(&self) -> usize {
        self.content.len()
    }

    /// Whether compilation ran and failed.
    pub fn compile_failed(&self) -> bool {
        matches!(&self.compile, Some(outcome) if !outcome.success)
    }
}

/// Statistics collected from the converted body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Lines in the converted body
    pub line_count: u32,

    /// Sectioning commands
    pub heading_count: u32,

    /// `equation` environments
    pub equation_count: u32,

    /// `table` floats and longtables
    pub table_count: u32,

    /// `figure` floats
    pub figure_count: u32,

    /// `itemize` and `enumerate` environments
    pub list_count: u32,

    /// `\cite` commands
    pub citation_count: u32,

    /// `\ref` and `\eqref` commands
    pub cross_reference_count: u32,

    /// Embed markers replaced by content
    pub embeds_resolved: u32,

    /// Embed markers left in place
    pub embeds_unresolved: u32,
}

impl ConversionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count constructs in converted LaTeX.
    pub fn from_latex(body: &str) -> Self {
        let count = |needle: &str| saturate(body.matches(needle).count());
        let heading_count = body
            .lines()
            .map(str::trim_start)
            .filter(|line| {
                ["\\section{", "\\subsection{", "\\subsubsection{", "\\paragraph{"]
                    .iter()
                    .any(|cmd| line.starts_with(cmd))
            })
            .count();

        Self {
            line_count: saturate(body.lines().count()),
            heading_count: saturate(heading_count),
            equation_count: count("\\begin{equation}"),
            table_count: count("\\begin{table}").saturating_add(count("\\begin{longtable}")),
            figure_count: count("\\begin{figure}"),
            list_count: count("\\begin{itemize}").saturating_add(count("\\begin{enumerate}")),
            citation_count: count("\\cite{"),
            cross_reference_count: count("\\ref{").saturating_add(count("\\eqref{")),
            embeds_resolved: 0,
            embeds_unresolved: 0,
        }
    }

    /// Record embed resolution counts.
    pub fn with_embeds(mut self, report: ResolveReport) -> Self {
        self.embeds_resolved = saturate(report.resolved);
        self.embeds_unresolved = saturate(report.unresolved);
        self
    }

    /// Add another document's counts.
    pub fn merge(&mut self, other: &ConversionStats) {
        self.line_count = self.line_count.saturating_add(other.line_count);
        self.heading_count = self.heading_count.saturating_add(other.heading_count);
        self.equation_count = self.equation_count.saturating_add(other.equation_count);
        self.table_count = self.table_count.saturating_add(other.table_count);
        self.figure_count = self.figure_count.saturating_add(other.figure_count);
        self.list_count = self.list_count.saturating_add(other.list_count);
        self.citation_count = self.citation_count.saturating_add(other.citation_count);
        self.cross_reference_count = self.cross_reference_count.saturating_add(other.cross_reference_count);
        self.embeds_resolved = self.embeds_resolved.saturating_add(other.embeds_resolved);
        self.embeds_unresolved = self.embeds_unresolved.saturating_add(other.embeds_unresolved);
    }
}

/// Clamp a count to `u32::MAX` instead of wrapping.
fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_latex() {
        let body = "\\section{A}\n\\subsection{B}\n\\begin{equation}\n\\end{equation}\n\
                    see \\ref{x} and \\eqref{eq:y} and \\cite{p1}\n\
                    \\begin{itemize}\n\\item a\n\\end{itemize}\n\\begin{table}[h]\n\\end{table}";
        let stats = ConversionStats::from_latex(body);
        assert_eq!(stats.heading_count, 2);
        assert_eq!(stats.equation_count, 1);
        assert_eq!(stats.cross_reference_count, 2);
        assert_eq!(stats.citation_count, 1);
        assert_eq!(stats.list_count, 1);
        assert_eq!(stats.table_count, 1);
        assert_eq!(stats.line_count, 10);
    }

    #[test]
    fn test_stats_merge_and_embeds() {
        let mut total = ConversionStats::new();
        let one = ConversionStats::from_latex("\\section{A}").with_embeds(ResolveReport {
            resolved: 2,
            unresolved: 1,
        });
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.heading_count, 2);
        assert_eq!(total.embeds_resolved, 4);
        assert_eq!(total.embeds_unresolved, 2);
    }

    #[test]
    fn test_counts_saturate() {
        assert_eq!(saturate(7), 7);
        assert_eq!(saturate(usize::MAX), u32::MAX);

        let mut total = ConversionStats {
            citation_count: u32::MAX - 1,
            ..ConversionStats::default()
        };
        total.merge(&ConversionStats::from_latex("\\cite{p1} \\cite{p2}"));
        assert_eq!(total.citation_count, u32::MAX);
        assert_eq!(total.line_count, 1);
    }
}
