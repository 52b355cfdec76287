//! Project tree access for upkeep.
//!
//! A project tree is a directory of model files, binaries and resources.
//! This crate walks it, applies the fixed ignore set (index caches,
//! manifests, deployment output, version-control metadata) and hands out
//! [`TrackedFile`]s addressed by tree-relative, `/`-separated paths.
//!
//! # Key Types
//!
//! - [`ProjectTree`] -- A rooted tree with its ignore rules
//! - [`TrackedFile`] -- One non-ignored file, read on demand
//! - [`DEFAULT_IGNORE_PATTERNS`] -- The gitignore-style default ignore set

pub mod error;
pub mod path;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use path::{file_name_of, normalize};
pub use tree::{ProjectTree, TrackedFile, DEFAULT_IGNORE_PATTERNS};
