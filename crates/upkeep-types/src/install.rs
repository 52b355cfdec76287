use serde::{Deserialize, Serialize};

use crate::release::{BundleInfo, RegisteredProjectInfo};

/// What a tree was built from, as inferred from its file fingerprints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInstallInfo {
    /// The baseline release with the strongest evidence.
    pub project: RegisteredProjectInfo,
    /// Bundles whose files were found at the project's main version, sorted by name.
    pub bundles_applied: Vec<BundleInfo>,
    /// Bundles declared by manifests in the tree but not confirmed by any
    /// fingerprint, sorted by name.
    pub possible_bundles_applied: Vec<BundleInfo>,
}

impl ProjectInstallInfo {
    pub fn new(project: RegisteredProjectInfo) -> Self {
        Self {
            project,
            bundles_applied: Vec::new(),
            possible_bundles_applied: Vec::new(),
        }
    }

    /// Whether the named bundle was confidently identified.
    pub fn has_bundle(&self, name: &str) -> bool {
        self.bundles_applied.iter().any(|b| b.name == name)
    }
}
