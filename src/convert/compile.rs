//! LaTeX compilation.

use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Maximum number of `!` error lines kept from compiler output.
const MAX_ERROR_LINES: usize = 3;

/// Outcome of compiling a `.tex` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutcome {
    /// Whether the compiler reported success
    pub success: bool,

    /// Error summary on failure
    pub error: Option<String>,
}

impl CompileOutcome {
    /// A successful compilation.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed compilation.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Trait for LaTeX compilers.
pub trait Compiler: Send + Sync {
    /// Compiler name used in diagnostics.
    fn name(&self) -> &str;

    /// Compile the file at `tex_path`.
    fn compile(&self, tex_path: &Path) -> CompileOutcome;
}

/// Runs a LaTeX program such as `pdflatex` as a child process.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
}

impl LatexCompiler {
    /// Create a compiler running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Create the compiler named in the settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.latex_compiler.clone())
    }
}

impl Compiler for LatexCompiler {
    fn name(&self) -> &str {
        &self.program
    }

    fn compile(&self, tex_path: &Path) -> CompileOutcome {
        let Some(file_name) = tex_path.file_name() else {
            return CompileOutcome::failed(format!("not a file: {}", tex_path.display()));
        };
        let dir = tex_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        log::debug!("running {} on {}", self.program, tex_path.display());
        let output = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(file_name)
            .current_dir(dir)
            .output();

        match output {
            Ok(output) if output.status.success() => CompileOutcome::ok(),
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let errors: Vec<&str> = stdout
                    .lines()
                    .filter(|line| line.starts_with('!'))
                    .take(MAX_ERROR_LINES)
                    .collect();
                if errors.is_empty() {
                    CompileOutcome::failed(format!("{} exited with {}", self.program, output.status))
                } else {
                    CompileOutcome::failed(errors.join("\n"))
                }
            }
            Err(e) => CompileOutcome::failed(format!("failed to run {}: {}", self.program, e)),
        }
    }
}
