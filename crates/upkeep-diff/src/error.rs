//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// The two sides are not instances of the same record shape.
    #[error("shape mismatch at '{path}': {current} vs {previous}")]
    ShapeMismatch {
        path: String,
        current: &'static str,
        previous: &'static str,
    },

    /// Nesting went deeper than the engine accepts.
    #[error("record nesting exceeds {limit} levels at '{path}'")]
    DepthExceeded { path: String, limit: usize },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
