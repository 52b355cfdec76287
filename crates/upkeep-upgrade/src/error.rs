//! Error types for the upgrade crate.

use std::path::PathBuf;

use upkeep_diff::DiffError;
use upkeep_merge::MergeError;
use upkeep_registry::RegistryError;
use upkeep_tree::TreeError;

/// Errors that can occur while identifying, analyzing or upgrading a project.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// No registered release could be tied to the tree.
    #[error("project version could not be determined: {0}")]
    NotIdentifiable(String),

    /// A bundle directory lacks a usable manifest.
    #[error("invalid bundle at {path}: {reason}")]
    InvalidBundle { path: PathBuf, reason: String },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// A model file is not valid JSON of the expected shape.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for upgrade results.
pub type UpgradeResult<T> = Result<T, UpgradeError>;
