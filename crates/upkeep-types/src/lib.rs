//! Foundation types for upkeep.
//!
//! Every other upkeep crate depends on `upkeep-types`. The types here carry no
//! behavior beyond parsing, formatting and identity: the registry stores them,
//! the identifier produces them, the analyzer reads them.
//!
//! # Key Types
//!
//! - [`Fingerprint`] -- Content digest of a file's bytes (BLAKE3)
//! - [`ReleaseVersion`] -- Four-part `major.minor.build.revision` version
//! - [`BundleInfo`] -- An add-on package (identity is the name only)
//! - [`RegisteredProjectInfo`] -- A baseline release of a project
//! - [`FileRelease`] -- One registry row: a file pinned to a release
//! - [`ProjectInstallInfo`] -- Result of version identification

pub mod error;
pub mod fingerprint;
pub mod install;
pub mod release;
pub mod version;

pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use install::ProjectInstallInfo;
pub use release::{BundleInfo, FileRelease, RegisteredProjectInfo};
pub use version::ReleaseVersion;
