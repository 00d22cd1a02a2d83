//! Filesystem-backed document store.

use super::{normalize_path, DocumentStore};
use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Document store rooted at a vault directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a store-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for part in normalize_path(path).split('/').filter(|p| !p.is_empty()) {
            full.push(part);
        }
        full
    }
}

impl DocumentStore for FsStore {
    fn read(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(normalize_path(path)),
            _ => Error::Read {
                path: normalize_path(path),
                source: e,
            },
        })
    }

    /// Stage the content in a sibling temporary file and rename it over
    /// the target, so the target is replaced completely or not at all.
    fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path);
        let write_error = |source: io::Error| Error::Write {
            path: normalize_path(path),
            source,
        };

        let dir = full.parent().unwrap_or(self.root.as_path());
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(content.as_bytes()).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        if let Ok(meta) = fs::metadata(&full) {
            staged
                .as_file()
                .set_permissions(meta.permissions())
                .map_err(write_error)?;
        }

        staged.persist(&full).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    fn ensure_directory(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        fs::create_dir_all(&full).map_err(|e| Error::Write {
            path: normalize_path(path),
            source: e,
        })
    }

    fn list(&self, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(path);
        let entries = match fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(normalize_path(path)))
            }
            Err(e) => {
                return Err(Error::Read {
                    path: normalize_path(path),
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn locate(&self, path: &str) -> Option<PathBuf> {
        Some(self.resolve(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_components() {
        let store = FsStore::new("/vault");
        assert_eq!(
            store.resolve("✍Writing/equation blocks/eq.md"),
            PathBuf::from("/vault/✍Writing/equation blocks/eq.md")
        );
        assert_eq!(store.resolve("a\\b.md"), PathBuf::from("/vault/a/b.md"));
        assert_eq!(store.locate("x.md"), Some(PathBuf::from("/vault/x.md")));
    }
}
