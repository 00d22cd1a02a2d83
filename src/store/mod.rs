//! Document store abstraction.
//!
//! The pipeline never touches the filesystem directly: it reads notes and
//! writes `.tex` output through a [`DocumentStore`]. Paths are
//! store-relative and `/`-separated, the way a vault names its notes
//! (e.g. `✍Writing/equation blocks/eq__block_einstein.md`).
//!
//! # Example
//!
//! ```
//! use note2tex::store::{DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new().with_document("notes/a.md", "# A");
//! assert_eq!(store.read("notes/a.md").unwrap(), "# A");
//! assert!(store.read("notes/b.md").unwrap_err().is_not_found());
//! ```

mod fs;

pub use fs::FsStore;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Trait for document stores.
///
/// Implement this trait to convert notes living somewhere other than a
/// local directory.
pub trait DocumentStore: Send + Sync {
    /// Read a document. Absent documents yield [`Error::NotFound`],
    /// unreadable ones [`Error::Read`].
    fn read(&self, path: &str) -> Result<String>;

    /// Write a document, replacing any previous content.
    fn write(&self, path: &str, content: &str) -> Result<()>;

    /// Make sure a directory exists.
    fn ensure_directory(&self, path: &str) -> Result<()>;

    /// List entry names directly under a directory, sorted.
    fn list(&self, path: &str) -> Result<Vec<String>>;

    /// Real filesystem location of a document, if the store has one.
    fn locate(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}

/// In-memory document store.
///
/// Directories are implicit: any path prefix of a stored document is a
/// directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, builder style.
    pub fn with_document(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a document.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        let mut docs = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.insert(normalize_path(&path.into()), content.into());
    }

    /// Get a document's content, if present.
    pub fn get(&self, path: &str) -> Option<String> {
        let docs = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.get(&normalize_path(path)).cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, path: &str) -> Result<String> {
        self.get(path)
            .ok_or_else(|| Error::NotFound(normalize_path(path)))
    }

    fn write(&self, path: &str, content: &str) -> Result<()> {
        self.insert(path, content);
        Ok(())
    }

    fn ensure_directory(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn list(&self, path: &str) -> Result<Vec<String>> {
        let dir = normalize_path(path);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let docs = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = docs
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Collapse backslashes, duplicate and trailing separators.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two store paths.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = normalize_path(dir);
    let name = normalize_path(name);
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name,
        (_, true) => dir,
        _ => format!("{}/{}", dir, name),
    }
}

/// Directory part of a store path (empty for top-level documents).
pub fn parent_dir(path: &str) -> String {
    let path = normalize_path(path);
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// File name without directory and extension.
pub fn basename(path: &str) -> String {
    let path = normalize_path(path);
    let file = path.rsplit('/').next().unwrap_or(&path);
    match file.rfind('.') {
        Some(idx) if idx > 0 => file[..idx].to_string(),
        _ => file.to_string(),
    }
}

/// Whether the last path component carries an extension.
pub fn has_extension(path: &str) -> bool {
    let path = normalize_path(path);
    let file = path.rsplit('/').next().unwrap_or(&path);
    matches!(file.rfind('.'), Some(idx) if idx > 0 && idx + 1 < file.len())
}
