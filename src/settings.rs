//! Conversion settings.
//!
//! A [`Settings`] value is an immutable snapshot handed to every stage.
//! It deserializes from the JSON settings file with camelCase keys, and
//! every key is optional.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// User-tunable conversion options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// LaTeX document class
    pub document_class: String,

    /// Class font size option (e.g. "11pt"), empty for the class default
    pub font_size: String,

    /// `\author{}` value, empty to omit
    pub author: String,

    /// `\title{}` value, empty to omit title and `\maketitle`
    pub title: String,

    /// geometry margin (e.g. "0.9in"), empty for the package default
    pub margin: String,

    /// Paragraph indent in points
    pub paragraph_indent: u32,

    /// Prefix the body with `\tableofcontents`
    pub add_table_of_contents: bool,

    /// Emit `\newpage` before the bibliography
    pub add_new_page_before_bibliography: bool,

    /// Emit `\allowdisplaybreaks`
    pub allow_display_breaks: bool,

    /// Flatten remaining `[[links]]` to their display text
    pub convert_non_embedded_references: bool,

    /// Expand `!ref{name}` inclusion markers
    pub dynamic_inclusion: bool,

    /// Place included figures where they appear (`[h]`) instead of on top (`[t]`)
    pub put_figure_below_text: bool,

    /// Keep directories in included image paths
    pub include_path: bool,

    /// Tabular environment used for Markdown tables
    pub table_package: TablePackage,

    /// Horizontal placement of tables
    pub table_alignment: TableAlignment,

    /// Width of tabularx tables relative to `\linewidth` (0 = full width)
    pub table_rel_width: f64,

    /// `\bibliographystyle{}` value
    pub bibliography_style: String,

    /// `\bibliography{}` database name
    pub bibliography_file: String,

    /// Program used to compile the generated `.tex` file
    pub latex_compiler: String,

    /// Compile automatically after a successful write
    pub auto_compile: bool,

    /// Normalize source text to Unicode NFC before converting
    pub normalize_unicode: bool,

    /// Convert several documents in parallel
    pub parallel: bool,

    /// Directory receiving `.tex` output
    pub writing_path: String,

    /// Directory holding `eq__block_*` documents
    pub equation_blocks_path: String,

    /// Directory holding `table__block_*` documents
    pub table_blocks_path: String,

    /// Directory holding `figure__block_*` documents
    pub figure_blocks_path: String,
}

impl Settings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON string. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.document_class.trim().is_empty() {
            return Err(Error::Config("documentClass must not be empty".into()));
        }
        if !self.table_rel_width.is_finite() || self.table_rel_width < 0.0 {
            return Err(Error::Config(format!(
                "tableRelWidth must be a non-negative number, got {}",
                self.table_rel_width
            )));
        }
        if self.writing_path.trim().is_empty() {
            return Err(Error::Config("writingPath must not be empty".into()));
        }
        Ok(())
    }

    /// Set the document class.
    pub fn with_document_class(mut self, class: impl Into<String>) -> Self {
        self.document_class = class.into();
        self
    }

    /// Set the font size option.
    pub fn with_font_size(mut self, size: impl Into<String>) -> Self {
        self.font_size = size.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the page margin.
    pub fn with_margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = margin.into();
        self
    }

    /// Enable or disable the table of contents.
    pub fn with_table_of_contents(mut self, add: bool) -> Self {
        self.add_table_of_contents = add;
        self
    }

    /// Enable or disable the page break before the bibliography.
    pub fn with_new_page_before_bibliography(mut self, add: bool) -> Self {
        self.add_new_page_before_bibliography = add;
        self
    }

    /// Enable or disable link flattening.
    pub fn with_non_embedded_references(mut self, convert: bool) -> Self {
        self.convert_non_embedded_references = convert;
        self
    }

    /// Enable or disable `!ref{}` expansion.
    pub fn with_dynamic_inclusion(mut self, enabled: bool) -> Self {
        self.dynamic_inclusion = enabled;
        self
    }

    /// Set the table package.
    pub fn with_table_package(mut self, package: TablePackage) -> Self {
        self.table_package = package;
        self
    }

    /// Set the table alignment.
    pub fn with_table_alignment(mut self, alignment: TableAlignment) -> Self {
        self.table_alignment = alignment;
        self
    }

    /// Set the tabularx relative width.
    pub fn with_table_rel_width(mut self, width: f64) -> Self {
        self.table_rel_width = width;
        self
    }

    /// Set the LaTeX compiler program.
    pub fn with_compiler(mut self, program: impl Into<String>) -> Self {
        self.latex_compiler = program.into();
        self
    }

    /// Enable or disable automatic compilation.
    pub fn with_auto_compile(mut self, compile: bool) -> Self {
        self.auto_compile = compile;
        self
    }

    /// Enable or disable parallel batch conversion.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the output directory.
    pub fn with_writing_path(mut self, path: impl Into<String>) -> Self {
        self.writing_path = path.into();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            document_class: "extarticle".to_string(),
            font_size: String::new(),
            author: "Auteur".to_string(),
            title: String::new(),
            margin: "0.9in".to_string(),
            paragraph_indent: 0,
            add_table_of_contents: true,
            add_new_page_before_bibliography: true,
            allow_display_breaks: true,
            convert_non_embedded_references: true,
            dynamic_inclusion: true,
            put_figure_below_text: true,
            include_path: true,
            table_package: TablePackage::Tabularx,
            table_alignment: TableAlignment::Center,
            table_rel_width: 1.2,
            bibliography_style: "apacite".to_string(),
            bibliography_file: "BIBTEX".to_string(),
            latex_compiler: "pdflatex".to_string(),
            auto_compile: true,
            normalize_unicode: true,
            parallel: true,
            writing_path: "✍Writing".to_string(),
            equation_blocks_path: "✍Writing/equation blocks".to_string(),
            table_blocks_path: "✍Writing/table blocks".to_string(),
            figure_blocks_path: "✍Writing/figure blocks".to_string(),
        }
    }
}

/// Tabular environment used when rendering Markdown tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TablePackage {
    /// `tabularx` inside a `table` float, with a relative width
    #[default]
    Tabularx,
    /// `longtable` with repeating header and footer
    Longtable,
    /// Plain `tabular` inside a `table` float
    #[serde(alias = "standard")]
    Tabular,
}

impl FromStr for TablePackage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabularx" => Ok(TablePackage::Tabularx),
            "longtable" => Ok(TablePackage::Longtable),
            "tabular" | "standard" => Ok(TablePackage::Tabular),
            other => Err(Error::Config(format!("unknown table package: {}", other))),
        }
    }
}

impl fmt::Display for TablePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TablePackage::Tabularx => "tabularx",
            TablePackage::Longtable => "longtable",
            TablePackage::Tabular => "tabular",
        };
        f.write_str(name)
    }
}

/// Horizontal placement of rendered tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAlignment {
    /// Flush left
    Left,
    /// Centered
    #[default]
    Center,
    /// Flush right
    Right,
}

impl TableAlignment {
    /// Declaration used inside `table` floats.
    pub fn float_command(self) -> &'static str {
        match self {
            TableAlignment::Left => "\\raggedright",
            TableAlignment::Center => "\\centering",
            TableAlignment::Right => "\\raggedleft",
        }
    }

    /// Position argument of `longtable`.
    pub fn longtable_position(self) -> char {
        match self {
            TableAlignment::Left => 'l',
            TableAlignment::Center => 'c',
            TableAlignment::Right => 'r',
        }
    }
}

impl FromStr for TableAlignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(TableAlignment::Left),
            "center" | "centre" => Ok(TableAlignment::Center),
            "right" => Ok(TableAlignment::Right),
            other => Err(Error::Config(format!("unknown table alignment: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.document_class, "extarticle");
        assert_eq!(settings.table_package, TablePackage::Tabularx);
        assert_eq!(settings.table_rel_width, 1.2);
        assert!(settings.add_table_of_contents);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new()
            .with_document_class("ifacconf")
            .with_table_package(TablePackage::Longtable)
            .with_table_of_contents(false)
            .with_auto_compile(false);

        assert_eq!(settings.document_class, "ifacconf");
        assert_eq!(settings.table_package, TablePackage::Longtable);
        assert!(!settings.add_table_of_contents);
        assert!(!settings.auto_compile);
    }

    #[test]
    fn test_settings_from_partial_json() {
        let json = r#"{
            "documentClass": "article",
            "tablePackage": "longtable",
            "tableAlignment": "right",
            "addTableOfContents": false
        }"#;
        let settings = Settings::from_json_str(json).unwrap();
        assert_eq!(settings.document_class, "article");
        assert_eq!(settings.table_package, TablePackage::Longtable);
        assert_eq!(settings.table_alignment, TableAlignment::Right);
        assert!(!settings.add_table_of_contents);
        // untouched keys keep defaults
        assert_eq!(settings.margin, "0.9in");
        assert_eq!(settings.latex_compiler, "pdflatex");
    }

    #[test]
    fn test_settings_json_roundtrip_keys() {
        let json = Settings::default().to_json().unwrap();
        assert!(json.contains("\"documentClass\""));
        assert!(json.contains("\"tableRelWidth\""));
        assert!(json.contains("\"tabularx\""));
    }

    #[test]
    fn test_settings_validation() {
        let bad = Settings::new().with_table_rel_width(-1.0);
        assert!(matches!(bad.validate(), Err(Error::Config(_))));

        let bad = Settings::new().with_document_class("  ");
        assert!(bad.validate().is_err());

        assert!(Settings::from_json_str(r#"{"tableRelWidth": -2}"#).is_err());
        assert!(Settings::from_json_str(r#"{"tablePackage": "tabu"}"#).is_err());
    }

    #[test]
    fn test_table_package_parse() {
        assert_eq!(
            "Longtable".parse::<TablePackage>().unwrap(),
            TablePackage::Longtable
        );
        assert_eq!(
            "standard".parse::<TablePackage>().unwrap(),
            TablePackage::Tabular
        );
        assert!("tabu".parse::<TablePackage>().is_err());
        assert_eq!(TablePackage::Tabularx.to_string(), "tabularx");
    }

    #[test]
    fn test_table_alignment_commands() {
        assert_eq!(TableAlignment::Center.float_command(), "\\centering");
        assert_eq!(TableAlignment::Left.longtable_position(), 'l');
        assert_eq!(
            "centre".parse::<TableAlignment>().unwrap(),
            TableAlignment::Center
        );
    }
}
