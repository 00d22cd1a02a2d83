//! Embedded-reference resolution.
//!
//! Splices the content of `![[name]]`, `![[name#section]]` and
//! `![[name\command{section}]]` targets into the converted text. Block
//! documents (`eq__block_*`, `table__block_*`, `figure__block_*`) live in
//! their configured directories; any other target is a sibling of the
//! host note.

use crate::label::BlockKind;
use crate::settings::Settings;
use crate::store::{has_extension, join_path, parent_dir, DocumentStore};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A parsed embed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedReference {
    /// The marker text, e.g. `![[eq__block_x#expr]]`
    pub full_marker: String,
    /// Target document name
    pub target_name: String,
    /// Requested section, empty for the whole document
    pub section: String,
}

/// Outcome counts of a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    /// Markers replaced by content
    pub resolved: usize,
    /// Markers left in place
    pub unresolved: usize,
}

/// Store path of a reference target.
///
/// `eq__block_` names go to the equation blocks directory, `table__block_`
/// and `figure__block_` likewise; everything else resolves next to the
/// host document. `.md` is appended unless the name has an extension.
pub fn resolve_target_path(name: &str, settings: &Settings, host_dir: &str) -> String {
    let file = if has_extension(name) {
        name.to_string()
    } else {
        format!("{}.md", name)
    };

    let dir = match BlockKind::classify(name) {
        Some(BlockKind::Equation) => settings.equation_blocks_path.as_str(),
        Some(BlockKind::Table) => settings.table_blocks_path.as_str(),
        Some(BlockKind::Figure) => settings.figure_blocks_path.as_str(),
        None => host_dir,
    };
    join_path(dir, &file)
}

/// Extract a named section from a block document.
///
/// Tried in order, case-insensitively: a `#section` heading up to the
/// next `#` line, a `%% section %%` fence up to the next `%%` line, a
/// `\texttt{section}` line up to the next `\texttt` line. Without a
/// section, or when none of the forms match, the whole content is
/// returned.
pub fn extract_section(content: &str, section: &str) -> String {
    let section = section.trim();
    if section.is_empty() {
        return content.to_string();
    }

    let name = regex::escape(section);
    let forms = [
        (format!(r"#\s*{}\s*\n", name), "\n#"),
        (format!(r"%%\s*{}\s*%%\s*\n", name), "\n%%"),
        (format!(r"\\texttt\{{{}\}}\s*\n", name), "\n\\texttt"),
    ];

    for (pattern, terminator) in forms {
        let regex = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => regex,
            Err(e) => {
                log::debug!("section pattern for {:?} rejected: {}", section, e);
                continue;
            }
        };
        if let Some(m) = regex.find(content) {
            let rest = &content[m.end()..];
            let body = match rest.find(terminator) {
                Some(end) => &rest[..end],
                None => rest,
            };
            return body.trim().to_string();
        }
    }

    content.to_string()
}

/// Resolves embed markers against a document store.
pub struct EmbedResolver<'a> {
    store: &'a dyn DocumentStore,
    settings: &'a Settings,
    host_dir: String,
    marker_regex: Regex,
    command_section_regex: Regex,
}

impl<'a> EmbedResolver<'a> {
    /// Create a resolver for top-level host documents.
    pub fn new(store: &'a dyn DocumentStore, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            host_dir: String::new(),
            marker_regex: Regex::new(r"!\[\[([^\]]+)\]\]").unwrap(),
            command_section_regex: Regex::new(r"\\[A-Za-z]+\{([^}]*)\}").unwrap(),
        }
    }

    /// Resolve sibling targets relative to the host document at `path`.
    pub fn with_host(mut self, path: &str) -> Self {
        self.host_dir = parent_dir(path);
        self
    }

    /// Parse every embed marker in `content`, in order.
    pub fn extract_references(&self, content: &str) -> Vec<EmbeddedReference> {
        self.marker_regex
            .captures_iter(content)
            .filter_map(|caps| {
                let inner = caps.get(1)?.as_str();
                let target_end = inner.find(['#', '\\', '|']).unwrap_or(inner.len());
                let target_name = inner[..target_end].trim().to_string();
                if target_name.is_empty() {
                    return None;
                }

                let tail = &inner[target_end..];
                let section = if let Some(hash) = tail.strip_prefix('#') {
                    hash.split(['\\', '|']).next().unwrap_or("").trim().to_string()
                } else if let Some(caps) = self.command_section_regex.captures(tail) {
                    caps[1].trim().to_string()
                } else {
                    String::new()
                };

                Some(EmbeddedReference {
                    full_marker: caps[0].to_string(),
                    target_name,
                    section,
                })
            })
            .collect()
    }

    /// Store path of a reference.
    pub fn target_path(&self, reference: &EmbeddedReference) -> String {
        resolve_target_path(&reference.target_name, self.settings, &self.host_dir)
    }

    /// Replace each marker with its target's content.
    ///
    /// Markers are handled one at a time in document order; each one
    /// replaces the first remaining occurrence of its text. Unreadable
    /// targets leave the marker in place.
    pub fn resolve(&self, content: &str) -> (String, ResolveReport) {
        let references = self.extract_references(content);
        let mut processed = content.to_string();
        let mut report = ResolveReport::default();

        for reference in references {
            let path = self.target_path(&reference);
            let document = match self.store.read(&path) {
                Ok(document) => document.replace("\r\n", "\n"),
                Err(e) => {
                    log::warn!("embedded reference {} not resolved: {}", reference.full_marker, e);
                    report.unresolved += 1;
                    continue;
                }
            };

            let body = extract_section(&document, &reference.section);
            if body.trim().is_empty() {
                log::warn!(
                    "embedded reference {} resolved to empty content",
                    reference.full_marker
                );
                report.unresolved += 1;
                continue;
            }
            if self.marker_regex.is_match(&body) {
                log::debug!(
                    "content of {} contains embed markers; they are not expanded",
                    path
                );
            }

            let heading = if reference.section.is_empty() {
                reference.target_name.clone()
            } else {
                format!("{}#{}", reference.target_name, reference.section)
            };
            let block = format!(
                "\n% Start embedded reference:\n% {}\n{}\n% End embedded reference\n",
                heading, body
            );

            if processed.contains(&reference.full_marker) {
                processed = processed.replacen(&reference.full_marker, &block, 1);
                report.resolved += 1;
            } else {
                report.unresolved += 1;
            }
        }

        (processed, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_resolve_target_path() {
        let settings = Settings::default();
        assert_eq!(
            resolve_target_path("eq__block_x", &settings, "notes"),
            "✍Writing/equation blocks/eq__block_x.md"
        );
        assert_eq!(
            resolve_target_path("table__block_t", &settings, "notes"),
            "✍Writing/table blocks/table__block_t.md"
        );
        assert_eq!(
            resolve_target_path("figure__block_f", &settings, ""),
            "✍Writing/figure blocks/figure__block_f.md"
        );
        assert_eq!(resolve_target_path("Intro", &settings, "notes"), "notes/Intro.md");
        assert_eq!(resolve_target_path("plot.png", &settings, "notes"), "notes/plot.png");
    }

    #[test]
    fn test_extract_references() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        let resolver = EmbedResolver::new(&store, &settings);
        let refs = resolver.extract_references(
            "a ![[eq__block_x#expr]] b ![[Intro\\texttt{Goals}]] c ![[plain]] ![[img.png|300]]",
        );

        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0].target_name, "eq__block_x");
        assert_eq!(refs[0].section, "expr");
        assert_eq!(refs[1].target_name, "Intro");
        assert_eq!(refs[1].section, "Goals");
        assert_eq!(refs[2].section, "");
        assert_eq!(refs[3].target_name, "img.png");
    }

    #[test]
    fn test_extract_section_forms() {
        let heading = "#intro\nhello\n#expr\nE=mc^{2}\n#other\nx";
        assert_eq!(extract_section(heading, "expr"), "E=mc^{2}");
        assert_eq!(extract_section(heading, "EXPR"), "E=mc^{2}");

        let fenced = "%% Setup %%\nline one\nline two\n%% Next %%\nz";
        assert_eq!(extract_section(fenced, "setup"), "line one\nline two");

        let command = "\\texttt{goals}\nreach\n\\texttt{risks}\nnone";
        assert_eq!(extract_section(command, "goals"), "reach");

        assert_eq!(extract_section("whole", "missing"), "whole");
        assert_eq!(extract_section("whole", ""), "whole");
        assert_eq!(extract_section("#a.b\nok", "a.b"), "ok");
    }

    #[test]
    fn test_resolve_missing_target_keeps_marker() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        let (out, report) = EmbedResolver::new(&store, &settings).resolve("x ![[gone]] y");
        assert_eq!(out, "x ![[gone]] y");
        assert_eq!(report, ResolveReport { resolved: 0, unresolved: 1 });
    }

    #[test]
    fn test_resolve_duplicate_markers() {
        let store = MemoryStore::new().with_document("n/Part.md", "body");
        let settings = Settings::default();
        let resolver = EmbedResolver::new(&store, &settings).with_host("n/host.md");
        let (out, report) = resolver.resolve("![[Part]]\n![[Part]]");
        assert_eq!(out.matches("% Start embedded reference:").count(), 2);
        assert!(!out.contains("![[Part]]"));
        assert_eq!(report.resolved, 2);
    }
}
