//! Pipeline orchestration.
//!
//! A [`Converter`] reads a note from a [`DocumentStore`], runs the line
//! stages, resolves embedded references, assembles the document and
//! writes `<writingPath>/<basename>.tex` back to the store. Compilation is
//! optional and never undoes a written conversion.
//!
//! # Example
//!
//! ```
//! use note2tex::convert::Converter;
//! use note2tex::store::{DocumentStore, MemoryStore};
//! use note2tex::Settings;
//!
//! fn main() -> note2tex::Result<()> {
//!     let store = MemoryStore::new().with_document("paper.md", "# Intro\nHello [[p1]]");
//!     let settings = Settings::default();
//!
//!     let result = Converter::new(&store, &settings).convert_note("paper.md")?;
//!     assert_eq!(result.output_path, "✍Writing/paper.tex");
//!     assert!(store.read("✍Writing/paper.tex")?.contains("\\cite{p1}"));
//!     Ok(())
//! }
//! ```

mod compile;
mod result;

pub use compile::{CompileOutcome, Compiler, LatexCompiler};
pub use result::{ConversionStats, ConvertResult, Rendered};

use crate::assemble::LatexAssembler;
use crate::embed::EmbedResolver;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::stage::{split_lines, EquationStage, MarkdownStage, ReferenceStage, Stage, TableStage};
use crate::store::{basename, join_path, DocumentStore};
use chrono::Utc;
use rayon::prelude::*;
use unicode_normalization::UnicodeNormalization;

/// Converts notes from a document store to LaTeX.
pub struct Converter<'a> {
    store: &'a dyn DocumentStore,
    settings: &'a Settings,
    compiler: Option<&'a dyn Compiler>,
}

impl<'a> Converter<'a> {
    /// Create a converter without a compiler.
    pub fn new(store: &'a dyn DocumentStore, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            compiler: None,
        }
    }

    /// Compile written files with `compiler` when `autoCompile` is on.
    pub fn with_compiler(mut self, compiler: &'a dyn Compiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// The settings snapshot in use.
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Run the pipeline on `text` without writing anything.
    ///
    /// `source_path` locates sibling documents for embeds and inclusions.
    pub fn render(&self, text: &str, source_path: &str) -> Rendered {
        let text = text.replace("\r\n", "\n");
        let text: String = if self.settings.normalize_unicode {
            text.nfc().collect()
        } else {
            text
        };

        let stages: Vec<Box<dyn Stage + 'a>> = vec![
            Box::new(MarkdownStage::new()),
            Box::new(EquationStage::new()),
            Box::new(TableStage::new(self.settings)),
            Box::new(ReferenceStage::new(self.settings).with_store(self.store, source_path)),
        ];

        let mut lines = split_lines(&text);
        for stage in &stages {
            log::debug!("{}: {} stage", source_path, stage.name());
            lines = stage.process(lines);
        }

        let (body, report) = EmbedResolver::new(self.store, self.settings)
            .with_host(source_path)
            .resolve(&lines.join("\n"));

        let content = LatexAssembler::new(self.settings).assemble(&split_lines(&body));
        let stats = ConversionStats::from_latex(&body).with_embeds(report);

        Rendered { content, stats }
    }

    /// Store path of the `.tex` file written for `source_path`.
    pub fn output_path(&self, source_path: &str) -> String {
        join_path(
            &self.settings.writing_path,
            &format!("{}.tex", basename(source_path)),
        )
    }

    /// Convert one note and write its `.tex` file.
    ///
    /// Reading the note, creating the writing directory or writing the
    /// output aborts the conversion. A compile failure does not.
    pub fn convert_note(&self, path: &str) -> Result<ConvertResult> {
        let source = self.store.read(path)?;
        let rendered = self.render(&source, path);

        let output_path = self.output_path(path);
        self.store.ensure_directory(&self.settings.writing_path)?;
        self.store.write(&output_path, &rendered.content)?;
        log::info!(
            "{} -> {} ({} lines)",
            path,
            output_path,
            rendered.stats.line_count
        );

        let compile = match self.compiler {
            Some(_) if self.settings.auto_compile => Some(
                self.compile(&output_path)
                    .unwrap_or_else(|e| CompileOutcome::failed(e.to_string())),
            ),
            _ => None,
        };

        Ok(ConvertResult {
            source: path.to_string(),
            output_path,
            content: rendered.content,
            stats: rendered.stats,
            compile,
            converted_at: Utc::now(),
        })
    }

    /// Convert several notes independently, in parallel when enabled.
    pub fn convert_notes(&self, paths: &[String]) -> Vec<Result<ConvertResult>> {
        self.convert_notes_with(paths, |_, _| {})
    }

    /// Like [`convert_notes`](Self::convert_notes), calling `on_done` as
    /// each note finishes. Results keep the order of `paths`.
    pub fn convert_notes_with<F>(&self, paths: &[String], on_done: F) -> Vec<Result<ConvertResult>>
    where
        F: Fn(&str, &Result<ConvertResult>) + Sync,
    {
        let convert = |path: &String| {
            let result = self.convert_note(path);
            on_done(path, &result);
            result
        };

        if self.settings.parallel && paths.len() > 1 {
            paths.par_iter().map(convert).collect()
        } else {
            paths.iter().map(convert).collect()
        }
    }

    /// `.tex` files under the writing path, sorted by name.
    pub fn find_tex_files(&self) -> Result<Vec<String>> {
        let names = match self.store.list(&self.settings.writing_path) {
            Ok(names) => names,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(names
            .into_iter()
            .filter(|name| name.ends_with(".tex"))
            .map(|name| join_path(&self.settings.writing_path, &name))
            .collect())
    }

    /// Compile a `.tex` file from the store.
    pub fn compile(&self, tex_path: &str) -> Result<CompileOutcome> {
        let compiler = self
            .compiler
            .ok_or_else(|| Error::Compile("no LaTeX compiler configured".into()))?;
        let location = self.store.locate(tex_path).ok_or_else(|| {
            Error::Compile(format!("{} has no filesystem location", tex_path))
        })?;

        let outcome = compiler.compile(&location);
        if outcome.success {
            log::info!("{} compiled {}", compiler.name(), tex_path);
        } else {
            log::warn!(
                "{} failed on {}: {}",
                compiler.name(),
                tex_path,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(outcome)
    }

    /// Compile the most recently modified `.tex` file.
    pub fn compile_latest(&self) -> Result<CompileOutcome> {
        let files = self.find_tex_files()?;
        let latest = files
            .iter()
            .max_by_key(|file| {
                self.store
                    .locate(file)
                    .and_then(|path| std::fs::metadata(path).ok())
                    .and_then(|meta| meta.modified().ok())
            })
            .ok_or_else(|| Error::NotFound(format!("{}/*.tex", self.settings.writing_path)))?;

        self.compile(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCompiler {
        calls: AtomicUsize,
        succeed: bool,
    }

    impl Compiler for CountingCompiler {
        fn name(&self) -> &str {
            "counting"
        }

        fn compile(&self, _tex_path: &Path) -> CompileOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                CompileOutcome::ok()
            } else {
                CompileOutcome::failed("! Undefined control sequence.")
            }
        }
    }

    #[test]
    fn test_output_path() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        let converter = Converter::new(&store, &settings);
        assert_eq!(converter.output_path("notes/My Paper.md"), "✍Writing/My Paper.tex");
    }

    #[test]
    fn test_convert_note_writes_tex() {
        let store = MemoryStore::new().with_document("paper.md", "# Intro\ntext");
        let settings = Settings::default();
        let result = Converter::new(&store, &settings).convert_note("paper.md").unwrap();

        let written = store.read("✍Writing/paper.tex").unwrap();
        assert_eq!(written, result.content);
        assert!(written.contains("\\section{Intro}"));
        assert_eq!(result.stats.heading_count, 1);
        assert!(result.compile.is_none());
    }

    #[test]
    fn test_missing_note_is_error() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        let err = Converter::new(&store, &settings).convert_note("nope.md").unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[test]
    fn test_compile_requires_location() {
        let store = MemoryStore::new().with_document("paper.md", "x");
        let settings = Settings::default();
        let compiler = CountingCompiler {
            calls: AtomicUsize::new(0),
            succeed: true,
        };
        let converter = Converter::new(&store, &settings).with_compiler(&compiler);

        let result = converter.convert_note("paper.md").unwrap();
        assert!(result.compile_failed());
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
        assert!(store.read("✍Writing/paper.tex").is_ok());
    }

    #[test]
    fn test_auto_compile_disabled() {
        let store = MemoryStore::new().with_document("paper.md", "x");
        let settings = Settings::default().with_auto_compile(false);
        let compiler = CountingCompiler {
            calls: AtomicUsize::new(0),
            succeed: false,
        };
        let result = Converter::new(&store, &settings)
            .with_compiler(&compiler)
            .convert_note("paper.md")
            .unwrap();
        assert!(result.compile.is_none());
    }

    #[test]
    fn test_convert_notes_parallel() {
        let store = MemoryStore::new()
            .with_document("a.md", "# A")
            .with_document("b.md", "# B")
            .with_document("c.md", "# C");
        let settings = Settings::default();
        let paths: Vec<String> = ["a.md", "b.md", "missing.md", "c.md"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = Converter::new(&store, &settings).convert_notes(&paths);
        assert_eq!(results.len(), 4);
        assert!(results[2].is_err());
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);

        let files = Converter::new(&store, &settings).find_tex_files().unwrap();
        assert_eq!(
            files,
            vec!["✍Writing/a.tex", "✍Writing/b.tex", "✍Writing/c.tex"]
        );
    }

    #[test]
    fn test_convert_notes_reports_each_note() {
        let store = MemoryStore::new()
            .with_document("a.md", "# A")
            .with_document("b.md", "# B");
        let paths: Vec<String> = ["a.md", "missing.md", "b.md"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for parallel in [true, false] {
            let settings = Settings::default().with_parallel(parallel);
            let done = AtomicUsize::new(0);
            let failed = AtomicUsize::new(0);

            let results = Converter::new(&store, &settings).convert_notes_with(&paths, |_, r| {
                done.fetch_add(1, Ordering::SeqCst);
                if r.is_err() {
                    failed.fetch_add(1, Ordering::SeqCst);
                }
            });

            assert_eq!(done.load(Ordering::SeqCst), 3);
            assert_eq!(failed.load(Ordering::SeqCst), 1);
            assert_eq!(results[0].as_ref().unwrap().source, "a.md");
            assert!(results[1].is_err());
        }
    }

    #[test]
    fn test_find_tex_files_without_directory() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        assert!(Converter::new(&store, &settings)
            .find_tex_files()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_compile_latest_without_files() {
        let store = MemoryStore::new();
        let settings = Settings::default();
        let err = Converter::new(&store, &settings).compile_latest().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_render_normalizes_unicode() {
        let store = MemoryStore::new();
        let settings = Settings::default().with_table_of_contents(false);
        let decomposed = "Cafe\u{301}";
        let rendered = Converter::new(&store, &settings).render(decomposed, "x.md");
        assert!(rendered.content.contains("Caf\u{e9}"));
    }
}
