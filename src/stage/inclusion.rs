//! Dynamic inclusion of `!ref{name}` targets.
//!
//! The target document is fetched, its content type sniffed, and it is
//! re-rendered with the matching mini-renderer before being spliced in
//! place of the marker.

use super::{escape_prose, region, split_lines, EquationStage, MarkdownStage, Stage, TableStage};
use crate::embed::resolve_target_path;
use crate::label::{normalize_label, BlockKind};
use crate::settings::Settings;
use crate::store::{parent_dir, DocumentStore};
use regex::{Captures, Regex};

/// Inclusion markers inside included content are not expanded.
pub const MAX_INCLUSION_DEPTH: usize = 1;

/// Sniffed type of an included document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Contains a well-formed Markdown table
    Table,
    /// Contains an image embed or mentions a figure
    Figure,
    /// Contains `$` math
    Equation,
    /// Anything else
    Generic,
}

/// Expands `!ref{…}` markers.
pub struct InclusionExpander<'a> {
    store: &'a dyn DocumentStore,
    settings: &'a Settings,
    host_dir: String,
    max_depth: usize,
    marker_regex: Regex,
    image_regex: Regex,
    figure_word_regex: Regex,
}

impl<'a> InclusionExpander<'a> {
    /// Create an expander reading from `store`.
    pub fn new(store: &'a dyn DocumentStore, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            host_dir: String::new(),
            max_depth: MAX_INCLUSION_DEPTH,
            marker_regex: Regex::new(r"!ref\{([^}]+)\}").unwrap(),
            image_regex: Regex::new(concat!(
                r"!\[\[(?P<embed>[^\]|#]+\.(?i:png|jpe?g|gif|svg|pdf|webp|bmp|tiff?))(?:\|[^\]]*)?\]\]",
                r"|!\[(?P<alt>[^\]]*)\]\((?P<url>[^)\s]+)\)",
            ))
            .unwrap(),
            figure_word_regex: Regex::new(r"(?i)\bfigure\b").unwrap(),
        }
    }

    /// Resolve sibling targets relative to the host document at `path`.
    pub fn with_host(mut self, path: &str) -> Self {
        self.host_dir = parent_dir(path);
        self
    }

    /// Sniff the content type: table, then figure, then equation.
    pub fn content_kind(&self, content: &str) -> ContentKind {
        let lines = split_lines(content);
        let equations = region::mask(&region::scan_equations(&lines), lines.len());
        if !region::scan_well_formed_tables(&lines, &equations).is_empty() {
            ContentKind::Table
        } else if self.image_regex.is_match(content) || self.figure_word_regex.is_match(content) {
            ContentKind::Figure
        } else if content.contains('$') {
            ContentKind::Equation
        } else {
            ContentKind::Generic
        }
    }

    /// Expand every marker in `text`.
    pub fn expand(&self, text: &str) -> String {
        self.expand_at(text, 0)
    }

    fn expand_at(&self, text: &str, depth: usize) -> String {
        if !text.contains("!ref{") {
            return text.to_string();
        }

        self.marker_regex
            .replace_all(text, |caps: &Captures| {
                let marker = &caps[0];
                let name = caps[1].trim();

                if depth >= self.max_depth {
                    log::warn!(
                        "{} inside included content left unresolved (inclusion depth limit {})",
                        marker,
                        self.max_depth
                    );
                    return marker.to_string();
                }

                let path = resolve_target_path(name, self.settings, &self.host_dir);
                match self.store.read(&path) {
                    Ok(content) => {
                        let rendered = self.render(name, &content.replace("\r\n", "\n"));
                        self.expand_at(&rendered, depth + 1)
                    }
                    Err(e) => {
                        log::warn!("{} not included: {}", marker, e);
                        marker.to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Render fetched content with the mini-renderer for its type.
    fn render(&self, name: &str, content: &str) -> String {
        let stem = match BlockKind::classify(name) {
            Some(kind) => name[kind.prefix().len()..].to_string(),
            None => normalize_label(name),
        };
        let markdown = || MarkdownStage::new().process(split_lines(content));

        let kind = self.content_kind(content);
        log::debug!("including {} as {:?}", name, kind);

        match kind {
            ContentKind::Table => TableStage::new(self.settings)
                .with_label(stem)
                .process(markdown())
                .join("\n"),
            ContentKind::Figure => self
                .render_figure(&stem, content)
                .unwrap_or_else(|| markdown().join("\n")),
            ContentKind::Equation => EquationStage::new()
                .with_default_label(stem)
                .process(markdown())
                .join("\n"),
            ContentKind::Generic => markdown().join("\n"),
        }
    }

    /// Render a figure float from the first image in `content`.
    fn render_figure(&self, stem: &str, content: &str) -> Option<String> {
        let caps = self.image_regex.captures(content)?;
        let (path, alt) = match caps.name("embed") {
            Some(embed) => (embed.as_str().trim(), ""),
            None => (
                caps.name("url").map_or("", |m| m.as_str()),
                caps.name("alt").map_or("", |m| m.as_str()),
            ),
        };

        let path = if self.settings.include_path {
            path
        } else {
            path.rsplit(['/', '\\']).next().unwrap_or(path)
        };

        let prose = self.image_regex.replace_all(content, "");
        let caption: Vec<&str> = prose
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("%%"))
            .collect();
        let caption = match caption.join(" ") {
            c if !c.is_empty() => c,
            _ if !alt.trim().is_empty() => alt.trim().to_string(),
            _ => stem.to_string(),
        };

        let placement = if self.settings.put_figure_below_text {
            'h'
        } else {
            't'
        };

        Some(format!(
            "\\begin{{figure}}[{}]\n\\centering\n\\includegraphics[width=\\linewidth]{{{}}}\n\\caption{{{}}}\n\\label{{fig:{}}}\n\\end{{figure}}",
            placement,
            path,
            escape_prose(&caption),
            stem
        ))
    }
}
