use crate::record::{BundleId, ProjectId};

/// Errors from registry operations.
///
/// Every variant is an integrity failure from the caller's point of view: a
/// lookup that fails this way must not be treated as "no match".
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The underlying SQLite store rejected an operation.
    #[error("registry storage error ({context}): {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    /// Stored data cannot be decoded.
    #[error("corrupt registry data: {0}")]
    Corrupt(String),

    /// A row referenced a bundle that was never registered.
    #[error("unknown bundle id {0}")]
    UnknownBundle(BundleId),

    /// A row referenced a project that was never registered.
    #[error("unknown project id {0}")]
    UnknownProject(ProjectId),

    /// I/O error while preparing the store location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous writer panicked while holding the store lock.
    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for RegistryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
