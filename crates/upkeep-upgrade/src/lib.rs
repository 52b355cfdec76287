//! Upgrade orchestration for upkeep.
//!
//! Identifies which stock release (and which bundles) a project tree was
//! built from, classifies the tree's customizations against that baseline,
//! and carries them into a new release tree.
//!
//! # Key Types
//!
//! - [`UpgradeService`] -- Path-based facade over registry, config and categories
//! - [`VersionIdentifier`] -- Fingerprint-driven project and bundle identification
//! - [`Analyzer`] -- Per-file classification and the upgrade run
//! - [`FileCategory`] / [`CategoryRegistry`] -- Per-file-kind rules, first match wins
//! - [`Registrar`] -- Windowed registration of project and bundle releases
//! - [`UpgradeReport`] -- Added / auto-mergeable / manual-merge paths plus warnings
//! - [`UpgradeConfig`] -- TOML-backed settings

pub mod analyze;
pub mod categories;
pub mod category;
pub mod config;
pub mod error;
pub mod identify;
pub mod manifest;
pub mod register;
pub mod report;
pub mod service;

pub use analyze::Analyzer;
pub use categories::{OrderedCollectionCategory, RelationshipCategory, ResourceCategory};
pub use category::{CategoryRegistry, FileCategory, Trees};
pub use config::UpgradeConfig;
pub use error::{UpgradeError, UpgradeResult};
pub use identify::VersionIdentifier;
pub use manifest::BundleManifest;
pub use register::{BundleRegistration, ProjectRegistration, Registrar};
pub use report::{UpgradeReport, UpgradeWarning};
pub use service::UpgradeService;

// Re-export key types
pub use upkeep_registry::{RegistrationProgress, ReleaseRegistry};
pub use upkeep_types::{
    BundleInfo, FileRelease, ProjectInstallInfo, RegisteredProjectInfo, ReleaseVersion,
};
