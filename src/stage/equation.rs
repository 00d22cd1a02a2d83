//! Display and inline math.

use super::region::{self, DISPLAY_DELIMITER};
use super::Stage;
use regex::{Captures, Regex};

/// Environments rendered as `equation` + `split`.
const ALIGNED_ENVIRONMENTS: [&str; 3] = ["aligned", "align*", "align"];

/// Equation stage.
///
/// Turns `$$ … $$` regions into numbered `equation` blocks, inline
/// `$…$` into `\(…\)`, and equation block references into `\eqref`.
pub struct EquationStage {
    default_label: Option<String>,
    label_regex: Regex,
    inline_regex: Regex,
    xref_regex: Regex,
}

impl EquationStage {
    /// Create the stage.
    pub fn new() -> Self {
        Self {
            default_label: None,
            label_regex: Regex::new(r"\\label\{(?:eq__block_|eq:)([^}]*)\}").unwrap(),
            inline_regex: Regex::new(r"(?P<pre>^|[^\\$])\$(?P<body>[^$]+?)\$").unwrap(),
            xref_regex: Regex::new(concat!(
                r"!?\[\[eq__block_(?P<link>[^\]#|]+)[^\]]*\]\]",
                r"|\\(?:eq)?ref\{eq__block_(?P<cmd>[^}]+)\}",
            ))
            .unwrap(),
        }
    }

    /// Label used for the first display equation when it carries none.
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = Some(label.into());
        self
    }

    fn render_display(&self, lines: &[String], first: bool) -> Vec<String> {
        let joined = lines.join("\n");
        let Some(open) = joined.find(DISPLAY_DELIMITER) else {
            return lines.to_vec();
        };

        let before = joined[..open].trim();
        let rest = &joined[open + DISPLAY_DELIMITER.len()..];
        let (inner, after) = match rest.find(DISPLAY_DELIMITER) {
            Some(close) => (&rest[..close], &rest[close + DISPLAY_DELIMITER.len()..]),
            None => (rest, ""),
        };

        let label = self
            .label_regex
            .captures(inner)
            .or_else(|| self.label_regex.captures(after))
            .map(|caps| caps[1].trim().to_string())
            .filter(|l| !l.is_empty())
            .or_else(|| self.default_label.clone().filter(|_| first));

        let body = self.label_regex.replace_all(inner, "");
        let after = self.label_regex.replace_all(after, "");

        let mut output = Vec::with_capacity(3);
        if !before.is_empty() {
            output.push(before.to_string());
        }
        output.push(equation_block(body.trim(), label.as_deref()));
        if !after.trim().is_empty() {
            output.push(after.trim().to_string());
        }
        output
    }

    fn convert_inline(&self, line: &str) -> String {
        if !line.contains('$') {
            return line.to_string();
        }
        self.inline_regex
            .replace_all(line, |caps: &Captures| {
                format!("{}\\({}\\)", &caps["pre"], &caps["body"])
            })
            .into_owned()
    }

    fn convert_references(&self, line: &str) -> String {
        if !line.contains("eq__block_") {
            return line.to_string();
        }
        self.xref_regex
            .replace_all(line, |caps: &Captures| {
                let whole = &caps[0];
                if whole.starts_with('!') {
                    return whole.to_string();
                }
                let name = caps
                    .name("link")
                    .or_else(|| caps.name("cmd"))
                    .map_or("", |m| m.as_str().trim());
                format!("\\eqref{{eq:{}}}", name)
            })
            .into_owned()
    }
}

impl Default for EquationStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for EquationStage {
    fn name(&self) -> &str {
        "equation"
    }

    fn process(&self, lines: Vec<String>) -> Vec<String> {
        let regions = region::scan_equations(&lines);
        let mut index = 0;
        let lines = region::rebuild(&lines, &regions, |_, slice| {
            index += 1;
            self.render_display(slice, index == 1)
        });

        let equations = region::rendered_equations(&lines);
        let tables = region::mask(
            &region::scan_well_formed_tables(&lines, &equations),
            lines.len(),
        );
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let line = if tables[i] {
                    line.clone()
                } else {
                    self.convert_inline(line)
                };
                self.convert_references(&line)
            })
            .collect()
    }
}

/// Render one numbered equation.
fn equation_block(body: &str, label: Option<&str>) -> String {
    let mut block = String::from("\\begin{equation}");
    if let Some(label) = label {
        block.push_str(&format!(" \\label{{eq:{}}}", label));
    }
    block.push('\n');

    if let Some(inner) = aligned_body(body) {
        let rows: Vec<String> = inner
            .split("\\\\")
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(|row| format!("\t\t{}", row))
            .collect();
        block.push_str("\t\\begin{split}\n");
        block.push_str(&rows.join(" \\\\\n"));
        block.push_str("\n\t\\end{split}\n");
    } else {
        for line in body.lines() {
            block.push('\t');
            block.push_str(line.trim_end());
            block.push('\n');
        }
    }

    block.push_str("\\end{equation}");
    block
}

/// Contents of an `aligned`/`align` body, if that is what it is.
fn aligned_body(body: &str) -> Option<&str> {
    ALIGNED_ENVIRONMENTS.iter().find_map(|env| {
        body.strip_prefix(&format!("\\begin{{{}}}", env))?
            .strip_suffix(&format!("\\end{{{}}}", env))
            .map(str::trim)
    })
}
