//! Markdown to LaTeX line rewriting.
//!
//! Handles headings, lists, inline formatting, links, comment lines and
//! escaping of LaTeX special characters. Display equations and
//! well-formed tables are left to their own stages.
//!
//! Commands generated here are spelled with private-use sentinel
//! characters until escaping is done, so generated markup is never
//! escaped a second time.

use super::region::{self, list_item, RegionKind};
use super::Stage;
use regex::{Captures, Regex};

const CMD: char = '\u{E000}';
const OPEN: char = '\u{E001}';
const CLOSE: char = '\u{E002}';
const RAW_START: char = '\u{E003}';
const RAW_END: char = '\u{E004}';

/// Highest heading level recognized (`########`).
const MAX_HEADING_LEVEL: usize = 8;

/// Markdown stage.
pub struct MarkdownStage {
    inline_regex: Regex,
    link_regex: Regex,
    protect_regex: Regex,
}

impl MarkdownStage {
    /// Create the stage.
    pub fn new() -> Self {
        Self {
            inline_regex: Regex::new(concat!(
                r"`(?P<code>[^`]+)`",
                r"|(?P<keep>\$\$.*?\$\$|\$[^$]+\$|!?\[\[[^\]]*\]\]|!ref\{[^}]*\}|\]\([^)]*\)|https?://[^\s<>]+)",
                r"|\*\*(?P<bold>.+?)\*\*",
                r"|\*(?P<italic>[^*]+?)\*",
                r"|==(?P<hl>.+?)==",
                r"|~~(?P<st>.+?)~~",
                r"|(?P<pre>^|\s)#(?P<tag>[\p{L}\p{N}_/-]+)",
            ))
            .unwrap(),
            link_regex: Regex::new(concat!(
                r"\[(?P<text>[^\[\]]+)\]\((?P<url>[^()\s]+)\)",
                r"|(?P<bare>https?://[^\s<>()\[\]{}\x{E000}-\x{E004}]+)",
            ))
            .unwrap(),
            protect_regex: Regex::new(concat!(
                r"\x{E003}[^\x{E004}]*\x{E004}",
                r"|\$\$.*?\$\$|\$\$|\$[^$]+\$",
                r"|!?\[\[[^\]]*\]\]",
                r"|!ref\{[^}]*\}",
                r"|\\[A-Za-z]+\*?(?:\[[^\]]*\])?(?:\{[^{}]*\})*",
                r"|\\.",
            ))
            .unwrap(),
        }
    }

    /// Convert one prose line. `None` drops the line.
    ///
    /// Lines that already start with a backslash are formatted and linked
    /// but not escaped.
    fn convert_line(&self, line: &str) -> Option<String> {
        let formatted = self.format_inline(line);
        let linked = self.convert_links(&formatted);
        if linked.trim_start().starts_with("%%") {
            return None;
        }
        Some(restore(&self.escape_line(&linked)))
    }

    fn format_inline(&self, text: &str) -> String {
        self.inline_regex
            .replace_all(text, |caps: &Captures| {
                if let Some(code) = caps.name("code") {
                    return command("texttt", &[code.as_str()]);
                }
                if let Some(keep) = caps.name("keep") {
                    return keep.as_str().to_string();
                }
                for (group, name) in [
                    ("bold", "textbf"),
                    ("italic", "textit"),
                    ("hl", "hl"),
                    ("st", "st"),
                ] {
                    if let Some(inner) = caps.name(group) {
                        return command(name, &[&self.format_inline(inner.as_str())]);
                    }
                }
                if let Some(tag) = caps.name("tag") {
                    let pre = caps.name("pre").map_or("", |m| m.as_str());
                    return format!("{}{}", pre, command("texttt", &[tag.as_str()]));
                }
                caps[0].to_string()
            })
            .into_owned()
    }

    fn convert_links(&self, text: &str) -> String {
        self.link_regex
            .replace_all(text, |caps: &Captures| {
                if let (Some(label), Some(url)) = (caps.name("text"), caps.name("url")) {
                    return format!(
                        "{}href{}{}{}{}{}{}",
                        CMD,
                        OPEN,
                        raw(url.as_str()),
                        CLOSE,
                        OPEN,
                        label.as_str(),
                        CLOSE
                    );
                }
                let bare = caps.name("bare").map_or("", |m| m.as_str());
                let url = bare.trim_end_matches(|c: char| ".,;:!?'\"".contains(c));
                let trailing = &bare[url.len()..];
                format!("{}url{}{}{}{}", CMD, OPEN, raw(url), CLOSE, trailing)
            })
            .into_owned()
    }

    /// Escape special characters outside protected spans.
    fn escape_line(&self, line: &str) -> String {
        if line.trim_start().starts_with('\\') {
            return line.to_string();
        }

        let mut out = String::with_capacity(line.len() + 8);
        let mut last = 0;
        for m in self.protect_regex.find_iter(line) {
            out.push_str(&escape_prose(&line[last..m.start()]));
            out.push_str(m.as_str());
            last = m.end();
        }
        out.push_str(&escape_prose(&line[last..]));
        out
    }
}

impl Default for MarkdownStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for MarkdownStage {
    fn name(&self) -> &str {
        "markdown"
    }

    fn process(&self, lines: Vec<String>) -> Vec<String> {
        let mut verbatim_regions = region::scan_equations(&lines);
        let equations = region::mask(&verbatim_regions, lines.len());
        verbatim_regions.extend(region::scan_well_formed_tables(&lines, &equations));
        let verbatim = region::mask(&verbatim_regions, lines.len());
        let lists = region::scan_lists(&lines, &verbatim);

        let mut output = Vec::with_capacity(lines.len() + lists.len() * 2);
        let mut next_list = 0;

        for (i, line) in lines.iter().enumerate() {
            if verbatim[i] {
                output.push(line.clone());
                continue;
            }

            let list = lists.get(next_list).filter(|r| r.contains(i));
            let environment = list.map(|r| match r.kind {
                RegionKind::NumberedList => "enumerate",
                _ => "itemize",
            });

            if let (Some(list), Some(env)) = (list, environment) {
                if list.start == i {
                    output.push(format!("\\begin{{{}}}", env));
                }
            }

            let text = match list_item(line) {
                Some((_, item)) if list.is_some() => format!("{}item {}", CMD, item),
                _ => convert_heading(line).unwrap_or_else(|| line.clone()),
            };

            if let Some(converted) = self.convert_line(&text) {
                output.push(converted);
            }

            if let (Some(list), Some(env)) = (list, environment) {
                if list.end == i + 1 {
                    output.push(format!("\\end{{{}}}", env));
                    next_list += 1;
                }
            }
        }

        output
    }
}

/// Rewrite a Markdown heading as a sectioning command.
fn convert_heading(line: &str) -> Option<String> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let title = line[level..].strip_prefix(' ')?.trim_end();

    let converted = match level {
        1 if title == "Appendix" => command("appendix", &[]),
        1 => command("section", &[title]),
        2 => command("subsection", &[title]),
        3 => command("subsubsection", &[title]),
        _ => format!(
            "{} {} {}{}",
            command("paragraph", &[title]),
            command("hspace", &["0pt"]),
            CMD,
            CMD
        ),
    };
    Some(converted)
}

/// Escape LaTeX special characters in user prose.
pub fn escape_prose(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("\\%"),
            '#' => out.push_str("\\#"),
            '$' => out.push_str("\\$"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '&' => out.push_str("\\&"),
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            _ => out.push(c),
        }
    }
    out
}

fn command(name: &str, args: &[&str]) -> String {
    let mut out = format!("{}{}", CMD, name);
    for arg in args {
        out.push(OPEN);
        out.push_str(arg);
        out.push(CLOSE);
    }
    out
}

fn raw(text: &str) -> String {
    format!("{}{}{}", RAW_START, text, RAW_END)
}

fn restore(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            CMD => Some('\\'),
            OPEN => Some('{'),
            CLOSE => Some('}'),
            RAW_START | RAW_END => None,
            other => Some(other),
        })
        .collect()
}
