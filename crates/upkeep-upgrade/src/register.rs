//! Recording stock releases in the registry.

use std::path::Path;

use serde::Serialize;
use tracing::info;
use upkeep_registry::{
    BundleId, NewFileRelease, ProjectId, RegistrationBatch, RegistrationProgress, ReleaseRegistry,
};
use upkeep_tree::ProjectTree;
use upkeep_types::{BundleInfo, RegisteredProjectInfo, ReleaseVersion};

use crate::config::UpgradeConfig;
use crate::error::UpgradeResult;
use crate::manifest::BundleManifest;

/// What a project registration wrote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectRegistration {
    pub id: ProjectId,
    pub project: RegisteredProjectInfo,
    pub files: usize,
}

/// What a bundle registration wrote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BundleRegistration {
    pub id: BundleId,
    pub bundle: BundleInfo,
    pub files: usize,
}

/// Writes project and bundle releases through windowed batches.
pub struct Registrar<'a> {
    registry: &'a dyn ReleaseRegistry,
    config: &'a UpgradeConfig,
}

impl<'a> Registrar<'a> {
    pub fn new(registry: &'a dyn ReleaseRegistry, config: &'a UpgradeConfig) -> Self {
        Self { registry, config }
    }

    /// Record a stock project release and every tracked file of `tree`.
    pub fn register_project(
        &self,
        tree: &ProjectTree,
        name: &str,
        version: ReleaseVersion,
        backup_file_name: Option<&str>,
        observer: impl FnMut(RegistrationProgress),
    ) -> UpgradeResult<ProjectRegistration> {
        let mut project = RegisteredProjectInfo::new(name, version);
        if let Some(backup) = backup_file_name {
            project = project.with_backup(backup);
        }
        let id = self.registry.register_project(&project)?;
        info!(project = name, %version, %id, "registering project release");
        let files = self.register_tree(tree, version, observer, |row| row.in_project(id))?;
        info!(project = name, files, "project registered");
        Ok(ProjectRegistration { id, project, files })
    }

    /// Record an extracted bundle. Its root must hold `manifest.json`; the
    /// directory name becomes the bundle's package filename.
    pub fn register_bundle(
        &self,
        bundle_dir: &Path,
        version: ReleaseVersion,
        observer: impl FnMut(RegistrationProgress),
    ) -> UpgradeResult<BundleRegistration> {
        let manifest = BundleManifest::read_from_bundle(bundle_dir)?;
        let tree = self.config.open_tree(bundle_dir)?;
        let file_name = tree
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bundle = BundleInfo::new(manifest.name, file_name, version);
        let id = self.registry.register_bundle(&bundle)?;
        info!(bundle = %bundle.name, %version, %id, "registering bundle");
        let files = self.register_tree(&tree, version, observer, |row| row.in_bundle(id))?;
        info!(bundle = %bundle.name, files, "bundle registered");
        Ok(BundleRegistration { id, bundle, files })
    }

    fn register_tree(
        &self,
        tree: &ProjectTree,
        version: ReleaseVersion,
        observer: impl FnMut(RegistrationProgress),
        attach: impl Fn(NewFileRelease) -> NewFileRelease,
    ) -> UpgradeResult<usize> {
        let files = tree.tracked_files()?;
        let mut batch = RegistrationBatch::new(self.registry, self.config.batch_size)
            .with_total(files.len())
            .with_observer(observer);
        for file in &files {
            let fingerprint = file.fingerprint()?;
            batch.push(attach(NewFileRelease::new(file.path.clone(), version, fingerprint)))?;
        }
        Ok(batch.finish()?)
    }
}

impl std::fmt::Debug for Registrar<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("batch_size", &self.config.batch_size)
            .finish()
    }
}
