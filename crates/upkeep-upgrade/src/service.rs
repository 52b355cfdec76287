use std::path::Path;

use upkeep_registry::{InMemoryRegistry, RegistrationProgress, ReleaseRegistry, SqliteRegistry};
use upkeep_tree::ProjectTree;
use upkeep_types::{FileRelease, ProjectInstallInfo, ReleaseVersion};

use crate::analyze::Analyzer;
use crate::category::CategoryRegistry;
use crate::config::UpgradeConfig;
use crate::error::UpgradeResult;
use crate::identify::VersionIdentifier;
use crate::register::{BundleRegistration, ProjectRegistration, Registrar};
use crate::report::UpgradeReport;

/// One registry, one configuration and the category list, behind a
/// path-based API.
pub struct UpgradeService {
    registry: Box<dyn ReleaseRegistry>,
    categories: CategoryRegistry,
    config: UpgradeConfig,
}

impl UpgradeService {
    /// Open (or create) the SQLite registry named by the configuration.
    pub fn open(config: UpgradeConfig) -> UpgradeResult<Self> {
        let registry = SqliteRegistry::open(&config.registry_path)?;
        Self::with_registry(Box::new(registry), config)
    }

    /// A service over a fresh in-memory registry.
    pub fn in_memory(config: UpgradeConfig) -> UpgradeResult<Self> {
        Self::with_registry(Box::new(InMemoryRegistry::new()), config)
    }

    /// Use `registry` with the default categories.
    pub fn with_registry(
        registry: Box<dyn ReleaseRegistry>,
        config: UpgradeConfig,
    ) -> UpgradeResult<Self> {
        Ok(Self {
            registry,
            categories: CategoryRegistry::with_default_categories()?,
            config,
        })
    }

    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    pub fn registry(&self) -> &dyn ReleaseRegistry {
        self.registry.as_ref()
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryRegistry {
        &mut self.categories
    }

    pub fn open_tree(&self, root: &Path) -> UpgradeResult<ProjectTree> {
        self.config.open_tree(root)
    }

    // ---- Registration ----

    pub fn register_project(
        &self,
        root: &Path,
        name: &str,
        version: ReleaseVersion,
        backup_file_name: Option<&str>,
        observer: impl FnMut(RegistrationProgress),
    ) -> UpgradeResult<ProjectRegistration> {
        let tree = self.open_tree(root)?;
        Registrar::new(self.registry(), &self.config).register_project(
            &tree,
            name,
            version,
            backup_file_name,
            observer,
        )
    }

    pub fn register_bundle(
        &self,
        bundle_dir: &Path,
        version: ReleaseVersion,
        observer: impl FnMut(RegistrationProgress),
    ) -> UpgradeResult<BundleRegistration> {
        Registrar::new(self.registry(), &self.config).register_bundle(bundle_dir, version, observer)
    }

    // ---- Identification and upgrade ----

    pub fn identify(&self, root: &Path) -> UpgradeResult<ProjectInstallInfo> {
        let tree = self.open_tree(root)?;
        VersionIdentifier::new(self.registry(), &self.config).identify(&tree)
    }

    pub fn analyze(&self, source: &Path, base: &Path) -> UpgradeResult<UpgradeReport> {
        let (source, base) = (self.open_tree(source)?, self.open_tree(base)?);
        Analyzer::new(self.registry(), &self.categories).analyze(&source, &base)
    }

    /// Analyze, then write into `target`, creating it if needed.
    pub fn upgrade(
        &self,
        source: &Path,
        base: &Path,
        target: &Path,
    ) -> UpgradeResult<UpgradeReport> {
        let (source, base) = (self.open_tree(source)?, self.open_tree(base)?);
        let target = ProjectTree::create(target, &self.config.ignore_patterns)?;
        Analyzer::new(self.registry(), &self.categories).upgrade(&source, &base, &target)
    }

    // ---- Queries ----

    /// Rows for a tree-relative path, or for a bare filename anywhere.
    pub fn lookup(&self, key: &str, by_filename: bool) -> UpgradeResult<Vec<FileRelease>> {
        let rows = if by_filename {
            self.registry.lookup_by_filename(key)?
        } else {
            self.registry.lookup_by_path(key)?
        };
        Ok(rows)
    }
}

impl std::fmt::Debug for UpgradeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeService")
            .field("categories", &self.categories)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn in_memory_service_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/Shop.dll"), "shop").unwrap();

        let svc = UpgradeService::in_memory(UpgradeConfig::default()).unwrap();
        let version = ReleaseVersion::new(7, 5, 2, 0);
        svc.register_project(dir.path(), "Shop", version, None, |_| {})
            .unwrap();

        let info = svc.identify(dir.path()).unwrap();
        assert_eq!(info.project.version, version);
        assert_eq!(svc.lookup("shop.DLL", true).unwrap().len(), 1);
        assert_eq!(svc.lookup("bin/Shop.dll", false).unwrap().len(), 1);
        assert_eq!(svc.categories().len(), 3);
    }

    #[test]
    fn open_creates_sqlite_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = UpgradeConfig {
            registry_path: dir.path().join("reg/releases.db"),
            ..Default::default()
        };
        let svc = UpgradeService::open(config).unwrap();
        assert_eq!(svc.registry().file_count().unwrap(), 0);
        assert!(dir.path().join("reg/releases.db").exists());
    }
}
