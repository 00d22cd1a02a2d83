//! Links, citations and typed cross-references.

use super::{escape_prose, InclusionExpander, Stage};
use crate::label::{is_citation, normalize_label, BlockKind};
use crate::settings::Settings;
use crate::store::DocumentStore;
use regex::{Captures, Regex};

/// Reference stage.
///
/// Sub-rules run in order on every line: dynamic inclusion, internal
/// links, citations, link flattening, figure references, table
/// references.
pub struct ReferenceStage<'a> {
    settings: &'a Settings,
    inclusion: Option<InclusionExpander<'a>>,
    link_regex: Regex,
    citation_regex: Regex,
    flatten_regex: Regex,
    figure_regex: Regex,
    table_regex: Regex,
}

impl<'a> ReferenceStage<'a> {
    /// Create the stage without dynamic inclusion.
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            inclusion: None,
            link_regex: Regex::new(
                r"!?\[\[(?P<name>[^\]\[#|]+)(?:#(?P<section>[^\]\[|]+))?(?P<alias>\|[^\]\[]*)?\]\]",
            )
            .unwrap(),
            citation_regex: Regex::new(r"!?\[\[(?P<key>(?:p|ref)\d+)(?:\|[^\]\[]*)?\]\]").unwrap(),
            flatten_regex: Regex::new(r"!?\[\[(?P<target>[^\]\[|]+)(?:\|(?P<alias>[^\]\[]*))?\]\]")
                .unwrap(),
            figure_regex: typed_regex("figure__block_"),
            table_regex: typed_regex("table__block_"),
        }
    }

    /// Enable `!ref{}` expansion for a host document read from `store`.
    ///
    /// Has no effect when dynamic inclusion is disabled in the settings.
    pub fn with_store(mut self, store: &'a dyn DocumentStore, host_path: &str) -> Self {
        if self.settings.dynamic_inclusion {
            self.inclusion = Some(InclusionExpander::new(store, self.settings).with_host(host_path));
        }
        self
    }

    fn convert_links(&self, line: &str) -> String {
        self.link_regex
            .replace_all(line, |caps: &Captures| {
                let whole = &caps[0];
                let name = caps["name"].trim();
                if whole.starts_with('!')
                    || caps.name("alias").is_some()
                    || BlockKind::classify(name).is_some()
                {
                    return whole.to_string();
                }

                match caps.name("section") {
                    Some(section) => format!(
                        "\\ref{{{}:{}}}",
                        normalize_label(name),
                        normalize_label(section.as_str())
                    ),
                    None if is_citation(name) => format!("\\cite{{{}}}", name),
                    None => format!("\\ref{{{}}}", normalize_label(name)),
                }
            })
            .into_owned()
    }

    fn convert_citations(&self, line: &str) -> String {
        self.citation_regex
            .replace_all(line, |caps: &Captures| {
                if caps[0].starts_with('!') {
                    return caps[0].to_string();
                }
                format!("\\cite{{{}}}", &caps["key"])
            })
            .into_owned()
    }

    fn flatten_links(&self, line: &str) -> String {
        self.flatten_regex
            .replace_all(line, |caps: &Captures| {
                let whole = &caps[0];
                let target = caps["target"].trim();
                if whole.starts_with('!') || BlockKind::classify(target).is_some() {
                    return whole.to_string();
                }
                let shown = caps
                    .name("alias")
                    .map(|a| a.as_str().trim())
                    .filter(|a| !a.is_empty())
                    .unwrap_or(target);
                escape_prose(shown)
            })
            .into_owned()
    }

    fn convert_typed(&self, regex: &Regex, namespace: &str, line: &str) -> String {
        regex
            .replace_all(line, |caps: &Captures| {
                let whole = &caps[0];
                if whole.starts_with('!') {
                    return whole.to_string();
                }
                let name = caps
                    .name("link")
                    .or_else(|| caps.name("cmd"))
                    .map_or("", |m| m.as_str().trim());
                format!("\\ref{{{}:{}}}", namespace, name)
            })
            .into_owned()
    }
}

/// `[[<prefix>X]]` or `\ref{<prefix>X}`.
fn typed_regex(prefix: &str) -> Regex {
    Regex::new(&format!(
        r"!?\[\[{p}(?P<link>[^\]\[#|]+)[^\]]*\]\]|\\ref\{{{p}(?P<cmd>[^}}]+)\}}",
        p = prefix
    ))
    .unwrap()
}

impl Stage for ReferenceStage<'_> {
    fn name(&self) -> &str {
        "reference"
    }

    fn process(&self, lines: Vec<String>) -> Vec<String> {
        lines
            .into_iter()
            .map(|line| {
                let line = match &self.inclusion {
                    Some(inclusion) => inclusion.expand(&line),
                    None => line,
                };
                if !line.contains("[[") && !line.contains("__block_") {
                    return line;
                }

                let line = self.convert_links(&line);
                let line = self.convert_citations(&line);
                let line = if self.settings.convert_non_embedded_references {
                    self.flatten_links(&line)
                } else {
                    line
                };
                let line = self.convert_typed(&self.figure_regex, "fig", &line);
                self.convert_typed(&self.table_regex, "tab", &line)
            })
            .collect()
    }
}
