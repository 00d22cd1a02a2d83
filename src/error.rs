//! Error types for note2tex library.

use std::io;
use thiserror::Error;

/// Result type alias for note2tex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error outside of a specific store operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A referenced document does not exist in the store.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A document exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Store-relative path of the document
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The rendered output could not be persisted.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Store-relative path of the output
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Invalid or unreadable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external LaTeX compiler failed.
    #[error("Compilation error: {0}")]
    Compile(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error means the referenced document is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
