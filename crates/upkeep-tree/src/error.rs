//! Error types for the tree crate.

use std::path::PathBuf;

/// Errors that can occur while walking or touching a project tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree root is missing or not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An ignore pattern could not be compiled.
    #[error("invalid ignore pattern: {0}")]
    InvalidPattern(String),

    /// A relative path tried to escape the tree root.
    #[error("path escapes the tree root: {0}")]
    OutsideTree(String),

    /// Directory traversal failed.
    #[error("walk error: {0}")]
    Walk(String),
}

impl TreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
