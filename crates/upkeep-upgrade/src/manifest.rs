//! Bundle manifests.
//!
//! A bundle ships a `manifest.json` at its root; installing it drops a copy
//! named `<bundle>.manifest.json` under the project's manifest directory.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use upkeep_types::{BundleInfo, ReleaseVersion};

use crate::category::{ends_with_ignore_case, parse_json};
use crate::error::{UpgradeError, UpgradeResult};

/// Manifest file at the root of an extracted bundle.
pub const BUNDLE_MANIFEST_FILE: &str = "manifest.json";

/// Suffix of installed manifests inside a project tree.
pub const INSTALLED_MANIFEST_SUFFIX: &str = ".manifest.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub name: String,
    pub version: ReleaseVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BundleManifest {
    pub fn parse(path: &str, bytes: &[u8]) -> UpgradeResult<Self> {
        parse_json(path, bytes)
    }

    /// Read `manifest.json` from an extracted bundle directory.
    pub fn read_from_bundle(bundle_dir: &Path) -> UpgradeResult<Self> {
        let path = bundle_dir.join(BUNDLE_MANIFEST_FILE);
        let bytes = fs::read(&path).map_err(|e| UpgradeError::InvalidBundle {
            path: bundle_dir.to_path_buf(),
            reason: format!("cannot read {BUNDLE_MANIFEST_FILE}: {e}"),
        })?;
        Self::parse(&path.to_string_lossy(), &bytes).map_err(|e| UpgradeError::InvalidBundle {
            path: bundle_dir.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn is_installed_manifest(path: &str) -> bool {
        ends_with_ignore_case(path, INSTALLED_MANIFEST_SUFFIX)
    }

    /// The bundle this manifest describes, packaged as `file_name`.
    pub fn to_bundle(&self, file_name: impl Into<String>) -> BundleInfo {
        BundleInfo::new(self.name.clone(), file_name, self.version)
    }
}
