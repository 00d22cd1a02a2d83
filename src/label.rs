//! Label normalization and reference classification.
//!
//! Every cross-reference the pipeline emits goes through
//! [`normalize_label`], so `\ref{…}` targets stay LaTeX-safe no matter what
//! the note names look like.

/// Name prefix of equation block documents.
pub const EQUATION_BLOCK_PREFIX: &str = "eq__block_";

/// Name prefix of table block documents.
pub const TABLE_BLOCK_PREFIX: &str = "table__block_";

/// Name prefix of figure block documents.
pub const FIGURE_BLOCK_PREFIX: &str = "figure__block_";

/// Kind of block document, derived from the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `eq__block_*`
    Equation,
    /// `table__block_*`
    Table,
    /// `figure__block_*`
    Figure,
}

impl BlockKind {
    /// Classify a reference target by its prefix.
    pub fn classify(name: &str) -> Option<Self> {
        if name.starts_with(EQUATION_BLOCK_PREFIX) {
            Some(BlockKind::Equation)
        } else if name.starts_with(TABLE_BLOCK_PREFIX) {
            Some(BlockKind::Table)
        } else if name.starts_with(FIGURE_BLOCK_PREFIX) {
            Some(BlockKind::Figure)
        } else {
            None
        }
    }

    /// The name prefix for this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            BlockKind::Equation => EQUATION_BLOCK_PREFIX,
            BlockKind::Table => TABLE_BLOCK_PREFIX,
            BlockKind::Figure => FIGURE_BLOCK_PREFIX,
        }
    }

    /// LaTeX label namespace (`eq`, `tab`, `fig`).
    pub fn label_namespace(self) -> &'static str {
        match self {
            BlockKind::Equation => "eq",
            BlockKind::Table => "tab",
            BlockKind::Figure => "fig",
        }
    }

    /// Label for a block name, e.g. `eq__block_einstein` → `eq:einstein`.
    pub fn label_for(self, name: &str) -> String {
        let stem = name.strip_prefix(self.prefix()).unwrap_or(name);
        format!("{}:{}", self.label_namespace(), stem)
    }
}

/// Normalize an arbitrary reference name into a LaTeX-safe label.
///
/// Lower-cases the input, collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, and strips leading/trailing dashes.
pub fn normalize_label(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !label.is_empty() {
                label.push('-');
            }
            pending_dash = false;
            label.push(c);
        } else {
            pending_dash = true;
        }
    }

    label
}

/// Whether a link target is a bibliography key (`p12`, `ref3`).
pub fn is_citation(name: &str) -> bool {
    let digits = name
        .strip_prefix("ref")
        .or_else(|| name.strip_prefix('p'));

    match digits {
        Some(d) => !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
