use std::collections::HashMap;
use std::sync::RwLock;

use upkeep_types::{BundleInfo, FileRelease, RegisteredProjectInfo};

use crate::error::{RegistryError, RegistryResult};
use crate::record::{BundleId, NewFileRelease, ProjectId};
use crate::traits::ReleaseRegistry;

#[derive(Default)]
struct Tables {
    projects: Vec<RegisteredProjectInfo>,
    bundles: Vec<BundleInfo>,
    files: Vec<NewFileRelease>,
    /// ASCII-lowercased path -> indexes into `files`.
    by_path: HashMap<String, Vec<usize>>,
}

// Ids are 1-based positions, like SQLite rowids.
fn slot(id: i64) -> Option<usize> {
    id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
}

impl Tables {
    fn bundle(&self, id: BundleId) -> Option<&BundleInfo> {
        slot(id.0).and_then(|i| self.bundles.get(i))
    }

    fn project(&self, id: ProjectId) -> Option<&RegisteredProjectInfo> {
        slot(id.0).and_then(|i| self.projects.get(i))
    }

    fn check_refs(&self, row: &NewFileRelease) -> RegistryResult<()> {
        if let Some(id) = row.bundle {
            self.bundle(id).ok_or(RegistryError::UnknownBundle(id))?;
        }
        if let Some(id) = row.project {
            self.project(id).ok_or(RegistryError::UnknownProject(id))?;
        }
        Ok(())
    }

    fn resolve(&self, row: &NewFileRelease) -> FileRelease {
        FileRelease {
            path: row.path.clone(),
            file_name: row.file_name.clone(),
            version: row.version,
            fingerprint: row.fingerprint,
            bundle: row.bundle.and_then(|id| self.bundle(id)).cloned(),
            project: row.project.and_then(|id| self.project(id)).cloned(),
        }
    }
}

/// In-memory release registry.
///
/// Intended for tests and embedding. Tables live behind one `RwLock`, so a
/// window of rows becomes visible to readers all at once.
pub struct InMemoryRegistry {
    tables: RwLock<Tables>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> RegistryResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> RegistryResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| RegistryError::LockPoisoned)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseRegistry for InMemoryRegistry {
    fn register_project(&self, project: &RegisteredProjectInfo) -> RegistryResult<ProjectId> {
        let mut tables = self.write()?;
        tables.projects.push(project.clone());
        Ok(ProjectId(tables.projects.len() as i64))
    }

    fn register_bundle(&self, bundle: &BundleInfo) -> RegistryResult<BundleId> {
        let mut tables = self.write()?;
        tables.bundles.push(bundle.clone());
        Ok(BundleId(tables.bundles.len() as i64))
    }

    fn register_files(&self, rows: &[NewFileRelease]) -> RegistryResult<usize> {
        let mut tables = self.write()?;
        // Validate the whole window before touching anything.
        for row in rows {
            tables.check_refs(row)?;
        }
        for row in rows {
            let idx = tables.files.len();
            tables.files.push(row.clone());
            tables
                .by_path
                .entry(row.path.to_ascii_lowercase())
                .or_default()
                .push(idx);
        }
        Ok(rows.len())
    }

    fn lookup_by_path(&self, path: &str) -> RegistryResult<Vec<FileRelease>> {
        let tables = self.read()?;
        Ok(tables
            .by_path
            .get(&path.to_ascii_lowercase())
            .map(|idxs| idxs.iter().map(|&i| tables.resolve(&tables.files[i])).collect())
            .unwrap_or_default())
    }

    fn lookup_by_filename(&self, file_name: &str) -> RegistryResult<Vec<FileRelease>> {
        let tables = self.read()?;
        Ok(tables
            .files
            .iter()
            .filter(|row| row.file_name.eq_ignore_ascii_case(file_name))
            .map(|row| tables.resolve(row))
            .collect())
    }

    fn registered_bundles(&self) -> RegistryResult<Vec<BundleInfo>> {
        Ok(self.read()?.bundles.clone())
    }

    fn registered_projects(&self) -> RegistryResult<Vec<RegisteredProjectInfo>> {
        Ok(self.read()?.projects.clone())
    }

    fn file_count(&self) -> RegistryResult<usize> {
        Ok(self.read()?.files.len())
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.file_count().unwrap_or(0);
        f.debug_struct("InMemoryRegistry")
            .field("file_count", &count)
            .finish()
    }
}
