//! Work out which registered release a tree was built from.
//!
//! Every tracked file is fingerprinted and looked up by path. Files whose
//! only match is a project package binary vote for that project, and the
//! highest version wins. Bundles are then read off the remaining matches at
//! the project's main version, and off the manifests left behind by bundle
//! installs.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use upkeep_registry::ReleaseRegistry;
use upkeep_tree::ProjectTree;
use upkeep_types::{
    BundleInfo, FileRelease, ProjectInstallInfo, RegisteredProjectInfo, ReleaseVersion,
};

use crate::config::UpgradeConfig;
use crate::error::{UpgradeError, UpgradeResult};
use crate::manifest::BundleManifest;

/// Identifies project trees against a registry.
pub struct VersionIdentifier<'a> {
    registry: &'a dyn ReleaseRegistry,
    config: &'a UpgradeConfig,
}

impl<'a> VersionIdentifier<'a> {
    pub fn new(registry: &'a dyn ReleaseRegistry, config: &'a UpgradeConfig) -> Self {
        Self { registry, config }
    }

    pub fn identify(&self, tree: &ProjectTree) -> UpgradeResult<ProjectInstallInfo> {
        info!(root = %tree.root().display(), "identifying project version");
        let matches = self.matching_releases(tree)?;
        if matches.is_empty() {
            return Err(UpgradeError::NotIdentifiable(
                "no tracked file matches a registered release".into(),
            ));
        }

        let project = self.decisive_project(&matches).ok_or_else(|| {
            UpgradeError::NotIdentifiable("no decisive project evidence".into())
        })?;
        info!(project = %project.name, version = %project.version, "project identified");

        let bundles_applied = confident_bundles(&matches, &project.version);
        let possible_bundles_applied = self.possible_bundles(tree, &bundles_applied)?;

        if bundles_applied.is_empty() {
            info!("no bundles applied");
        }
        for bundle in &bundles_applied {
            info!(bundle = %bundle.name, version = %bundle.version, "bundle applied");
        }
        for bundle in &possible_bundles_applied {
            warn!(
                bundle = %bundle.name,
                version = %bundle.version,
                "bundle may have been applied but its files were not found"
            );
        }

        Ok(ProjectInstallInfo {
            project,
            bundles_applied,
            possible_bundles_applied,
        })
    }

    /// Matching rows for every tracked file that has at least one.
    fn matching_releases(&self, tree: &ProjectTree) -> UpgradeResult<Vec<Vec<FileRelease>>> {
        let mut matches = Vec::new();
        for file in tree.tracked_files()? {
            let fingerprint = file.fingerprint()?;
            let rows = self.registry.matching(&file.path, &fingerprint)?;
            debug!(path = %file.path, matches = rows.len(), "file looked up");
            if !rows.is_empty() {
                matches.push(rows);
            }
        }
        Ok(matches)
    }

    /// Highest project among package-binary matches that point at a single
    /// project row. Bundle rows sharing the same bytes do not count against it.
    fn decisive_project(&self, matches: &[Vec<FileRelease>]) -> Option<RegisteredProjectInfo> {
        matches
            .iter()
            .filter_map(|rows| {
                let mut projects = rows.iter().filter(|row| row.project.is_some());
                match (projects.next(), projects.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            })
            .filter(|row| row.file_name_ends_with(&self.config.package_binary_suffix))
            .filter_map(|row| row.project.as_ref())
            .max_by_key(|project| project.version)
            .cloned()
    }

    /// Registered bundles named by installed manifests but not confirmed by
    /// any fingerprint.
    fn possible_bundles(
        &self,
        tree: &ProjectTree,
        confident: &[BundleInfo],
    ) -> UpgradeResult<Vec<BundleInfo>> {
        let registered: HashSet<BundleInfo> =
            self.registry.registered_bundles()?.into_iter().collect();
        let mut seen = HashSet::new();
        let mut possible = Vec::new();
        for file in tree.files_under(&self.config.manifest_dir)? {
            if !BundleManifest::is_installed_manifest(&file.path) {
                continue;
            }
            let manifest = match file.read().map_err(UpgradeError::from).and_then(|bytes| {
                BundleManifest::parse(&file.path, &bytes)
            }) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %file.path, error = %e, "unreadable bundle manifest skipped");
                    continue;
                }
            };
            let bundle = manifest.to_bundle(file.file_name());
            if registered.contains(&bundle)
                && !confident.contains(&bundle)
                && seen.insert(bundle.name.clone())
            {
                possible.push(bundle);
            }
        }
        possible.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(possible)
    }
}

impl std::fmt::Debug for VersionIdentifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionIdentifier")
            .field("package_binary_suffix", &self.config.package_binary_suffix)
            .field("manifest_dir", &self.config.manifest_dir)
            .finish()
    }
}

/// Bundles seen in any match at the project's main version, one per name,
/// sorted by name.
fn confident_bundles(matches: &[Vec<FileRelease>], version: &ReleaseVersion) -> Vec<BundleInfo> {
    let mut seen = HashSet::new();
    let mut bundles: Vec<BundleInfo> = matches
        .iter()
        .flatten()
        .filter(|row| row.version.same_main_version(version))
        .filter_map(|row| row.bundle.clone())
        .filter(|bundle| seen.insert(bundle.clone()))
        .collect();
    bundles.sort_by(|a, b| a.name.cmp(&b.name));
    bundles
}
