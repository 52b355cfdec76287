//! Error types for the merge crate.

/// Errors that can occur while merging.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MergeError {
    /// An ordered collection listed the same key twice.
    #[error("duplicate key '{key}' in {side} collection")]
    DuplicateKey { key: String, side: &'static str },
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
