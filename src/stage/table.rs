//! Markdown tables to LaTeX tabular environments.

use super::region::{self, is_alignment_row, split_cells};
use super::Stage;
use crate::settings::{Settings, TableAlignment, TablePackage};

/// Caption placeholder emitted with every table.
const CAPTION_PLACEHOLDER: &str = "Table caption";

/// Column alignment from a Markdown alignment cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnAlignment {
    /// `-` or `:-`
    #[default]
    Left,
    /// `:-:`
    Center,
    /// `-:`
    Right,
}

impl ColumnAlignment {
    /// Parse an alignment cell such as `:---:`.
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':') && cell.len() > 1) {
            (true, true) => ColumnAlignment::Center,
            (false, true) => ColumnAlignment::Right,
            _ => ColumnAlignment::Left,
        }
    }

    /// Column-spec letter.
    pub fn letter(self) -> char {
        match self {
            ColumnAlignment::Left => 'l',
            ColumnAlignment::Center => 'c',
            ColumnAlignment::Right => 'r',
        }
    }
}

/// A parsed Markdown table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Header cells
    pub header: Vec<String>,
    /// One entry per column
    pub alignments: Vec<ColumnAlignment>,
    /// Data rows, each exactly as wide as the table
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    /// Parse a table run. Returns `None` unless the run has a header
    /// line followed by a valid alignment row.
    pub fn parse(lines: &[String]) -> Option<Self> {
        if lines.len() < 2 || !is_alignment_row(&lines[1]) {
            return None;
        }

        let alignments: Vec<ColumnAlignment> = split_cells(&lines[1])
            .iter()
            .map(|c| ColumnAlignment::from_cell(c))
            .collect();
        let width = alignments.len();

        let header = fit_row(split_cells(&lines[0]), width);
        let rows = lines[2..]
            .iter()
            .map(|line| fit_row(split_cells(line), width))
            .collect();

        Some(Self {
            header,
            alignments,
            rows,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.alignments.len()
    }

    /// LaTeX column specification, one letter per column.
    pub fn column_spec(&self) -> String {
        self.alignments.iter().map(|a| a.letter()).collect()
    }
}

/// Truncate or pad a row to `width` cells.
fn fit_row(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}

/// Escape LaTeX special characters inside a table cell.
pub fn escape_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '%' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Table stage.
pub struct TableStage {
    package: TablePackage,
    alignment: TableAlignment,
    rel_width: f64,
    label_base: Option<String>,
}

impl TableStage {
    /// Create the stage from settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            package: settings.table_package,
            alignment: settings.table_alignment,
            rel_width: settings.table_rel_width,
            label_base: None,
        }
    }

    /// Label tables `tab:<base>` instead of `tab:table_N`.
    pub fn with_label(mut self, base: impl Into<String>) -> Self {
        self.label_base = Some(base.into());
        self
    }

    fn label(&self, number: usize) -> String {
        match &self.label_base {
            Some(base) if number == 1 => format!("tab:{}", base),
            Some(base) => format!("tab:{}-{}", base, number),
            None => format!("tab:table_{}", number),
        }
    }

    /// Render a parsed table with the configured package.
    pub fn render(&self, spec: &TableSpec, label: &str) -> String {
        let header = format!("{} \\\\", escape_row(&spec.header));
        let rows: Vec<String> = spec
            .rows
            .iter()
            .map(|row| format!("{} \\\\", escape_row(row)))
            .collect();
        let caption = format!("\\caption{{{}}}", CAPTION_PLACEHOLDER);
        let label = format!("\\label{{{}}}", label);
        let column_spec = spec.column_spec();

        let mut out: Vec<String> = Vec::new();
        match self.package {
            TablePackage::Longtable => {
                out.push(format!(
                    "\\begin{{longtable}}[{}]{{{}}}",
                    self.alignment.longtable_position(),
                    column_spec
                ));
                out.push(caption);
                out.push(format!("{} \\\\", label));
                out.push("\\hline".into());
                out.push(header.clone());
                out.push("\\hline".into());
                out.push("\\endfirsthead".into());
                out.push("\\hline".into());
                out.push(header);
                out.push("\\hline".into());
                out.push("\\endhead".into());
                out.push("\\hline".into());
                out.push("\\endfoot".into());
                out.extend(rows);
                out.push("\\end{longtable}".into());
            }
            TablePackage::Tabularx | TablePackage::Tabular => {
                let environment = match self.package {
                    TablePackage::Tabularx => {
                        let width = if self.rel_width > 0.0 {
                            format!("{}\\linewidth", self.rel_width)
                        } else {
                            "\\linewidth".to_string()
                        };
                        out.push("\\begin{table}[h]".into());
                        out.push(self.alignment.float_command().into());
                        out.push(format!(
                            "\\begin{{tabularx}}{{{}}}{{{}}}",
                            width, column_spec
                        ));
                        "tabularx"
                    }
                    _ => {
                        out.push("\\begin{table}[h]".into());
                        out.push(self.alignment.float_command().into());
                        out.push(format!("\\begin{{tabular}}{{{}}}", column_spec));
                        "tabular"
                    }
                };
                out.push("\\hline".into());
                out.push(header);
                out.push("\\hline".into());
                if !rows.is_empty() {
                    out.extend(rows);
                    out.push("\\hline".into());
                }
                out.push(format!("\\end{{{}}}", environment));
                out.push(caption);
                out.push(label);
                out.push("\\end{table}".into());
            }
        }

        out.join("\n")
    }
}

fn escape_row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| escape_cell(c))
        .collect::<Vec<_>>()
        .join(" & ")
}

impl Stage for TableStage {
    fn name(&self) -> &str {
        "table"
    }

    fn process(&self, lines: Vec<String>) -> Vec<String> {
        let regions = region::scan_tables(&lines, &region::rendered_equations(&lines));
        let mut count = 0;

        region::rebuild(&lines, &regions, |run, slice| match TableSpec::parse(slice) {
            Some(spec) => {
                count += 1;
                vec![self.render(&spec, &self.label(count))]
            }
            None => {
                log::debug!(
                    "lines {}-{} contain '|' but are not a table; left unchanged",
                    run.start + 1,
                    run.end
                );
                slice.to_vec()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_parse_table() {
        let spec = TableSpec::parse(&lines("| a | b | c |\n|:-|:-:|-:|\n| 1 | 2 |\n| 3 | 4 | 5 | 6 |"))
            .unwrap();
        assert_eq!(spec.header, vec!["a", "b", "c"]);
        assert_eq!(
            spec.alignments,
            vec![
                ColumnAlignment::Left,
                ColumnAlignment::Center,
                ColumnAlignment::Right
            ]
        );
        assert_eq!(spec.rows[0], vec!["1", "2", ""]);
        assert_eq!(spec.rows[1], vec!["3", "4", "5"]);
        assert_eq!(spec.column_spec(), "lcr");
        assert_eq!(spec.column_spec().len(), spec.header.len());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TableSpec::parse(&lines("| a | b |")).is_none());
        assert!(TableSpec::parse(&lines("| a | b |\n| c | d |")).is_none());
    }

    #[test]
    fn test_render_tabularx() {
        let stage = TableStage::new(&Settings::default());
        let out = stage.process(lines("| H1 | H2 |\n|---|---|\n| a | b |"));
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0],
            [
                "\\begin{table}[h]",
                "\\centering",
                "\\begin{tabularx}{1.2\\linewidth}{ll}",
                "\\hline",
                "H1 & H2 \\\\",
                "\\hline",
                "a & b \\\\",
                "\\hline",
                "\\end{tabularx}",
                "\\caption{Table caption}",
                "\\label{tab:table_1}",
                "\\end{table}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_render_full_width_when_rel_width_zero() {
        let settings = Settings::default().with_table_rel_width(0.0);
        let out = TableStage::new(&settings).process(lines("| a |\n|---|"));
        assert!(out[0].contains("\\begin{tabularx}{\\linewidth}{l}"));
    }

    #[test]
    fn test_render_longtable() {
        let settings = Settings::default()
            .with_table_package(TablePackage::Longtable)
            .with_table_alignment(TableAlignment::Right);
        let out = TableStage::new(&settings).process(lines("| a | b |\n|:-:|--:|\n| 1 | 2 |"));
        let table = &out[0];
        assert!(table.starts_with("\\begin{longtable}[r]{cr}"));
        assert!(table.contains("\\endfirsthead"));
        assert!(table.contains("\\endhead"));
        assert!(table.contains("\\endfoot"));
        assert!(table.ends_with("1 & 2 \\\\\n\\end{longtable}"));
    }

    #[test]
    fn test_render_tabular_with_alignment() {
        let settings = Settings::default()
            .with_table_package(TablePackage::Tabular)
            .with_table_alignment(TableAlignment::Left);
        let out = TableStage::new(&settings).process(lines("| a |\n|---|\n| 1 |"));
        assert!(out[0].contains("\\raggedright\n\\begin{tabular}{l}"));
        assert!(out[0].contains("\\end{tabular}"));
    }

    #[test]
    fn test_header_only_table_has_no_data_block() {
        let out = TableStage::new(&Settings::default()).process(lines("| a | b |\n|---|---|"));
        assert!(out[0].contains("a & b \\\\\n\\hline\n\\end{tabularx}"));
    }

    #[test]
    fn test_tables_numbered() {
        let input = lines("| a |\n|---|\n\n| b |\n|---|");
        let out = TableStage::new(&Settings::default()).process(input);
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("\\label{tab:table_1}"));
        assert!(out[2].contains("\\label{tab:table_2}"));
    }

    #[test]
    fn test_label_base() {
        let stage = TableStage::new(&Settings::default()).with_label("results");
        let out = stage.process(lines("| a |\n|---|"));
        assert!(out[0].contains("\\label{tab:results}"));
    }

    #[test]
    fn test_malformed_runs_unchanged() {
        let input = lines("x | y\n\n| a | b |\n| c | d |");
        let out = TableStage::new(&Settings::default()).process(input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn test_equation_blocks_are_not_table_rows() {
        let block = "\\begin{equation}\n\t|x| = P(a|b)\n\\end{equation}".to_string();
        let mut input = vec![block.clone()];
        input.extend(lines("| a |\n|---|\n| 1 |"));

        let out = TableStage::new(&Settings::default()).process(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], block);
        assert!(out[1].contains("\\begin{tabularx}{1.2\\linewidth}{l}"));
        assert!(out[1].contains("1 \\\\"));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a_b & 50%"), "a\\_b \\& 50\\%");
        assert_eq!(escape_cell("x^2 ~ \\y"), "x\\^{}2 \\~{} \\textbackslash{}y");
        assert_eq!(escape_cell("{$#}"), "\\{\\$\\#\\}");
    }
}
