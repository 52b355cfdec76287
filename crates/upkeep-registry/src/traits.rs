use upkeep_types::{BundleInfo, Fingerprint, FileRelease, RegisteredProjectInfo};

use crate::error::RegistryResult;
use crate::record::{BundleId, NewFileRelease, ProjectId};

/// Fingerprint-indexed store of every file known to belong to a registered
/// project release or bundle.
///
/// All implementations must satisfy these invariants:
/// - Rows are immutable once written and are never deleted.
/// - [`register_files`](Self::register_files) is atomic: every row lands, or
///   none does.
/// - Path lookups ignore ASCII case.
/// - Reads may run concurrently; writes are serialized per store.
/// - Storage failures are errors, never an empty result.
pub trait ReleaseRegistry: Send + Sync {
    /// Record a project release and return its id.
    fn register_project(&self, project: &RegisteredProjectInfo) -> RegistryResult<ProjectId>;

    /// Record a bundle and return its id.
    fn register_bundle(&self, bundle: &BundleInfo) -> RegistryResult<BundleId>;

    /// Insert a window of file rows in one transaction. Returns the number
    /// of rows written.
    fn register_files(&self, rows: &[NewFileRelease]) -> RegistryResult<usize>;

    /// All rows registered for `path`, in registration order.
    fn lookup_by_path(&self, path: &str) -> RegistryResult<Vec<FileRelease>>;

    /// All rows whose filename equals `file_name`, in registration order.
    fn lookup_by_filename(&self, file_name: &str) -> RegistryResult<Vec<FileRelease>>;

    /// Every registered bundle, in registration order.
    fn registered_bundles(&self) -> RegistryResult<Vec<BundleInfo>>;

    /// Every registered project release, in registration order.
    fn registered_projects(&self) -> RegistryResult<Vec<RegisteredProjectInfo>>;

    /// Total number of file rows.
    fn file_count(&self) -> RegistryResult<usize>;

    /// Register a single file row.
    fn register(&self, row: &NewFileRelease) -> RegistryResult<()> {
        self.register_files(std::slice::from_ref(row)).map(|_| ())
    }

    /// Rows for `path` whose fingerprint equals `fingerprint`.
    ///
    /// Default implementation filters [`lookup_by_path`](Self::lookup_by_path).
    fn matching(&self, path: &str, fingerprint: &Fingerprint) -> RegistryResult<Vec<FileRelease>> {
        Ok(self
            .lookup_by_path(path)?
            .into_iter()
            .filter(|row| row.fingerprint == *fingerprint)
            .collect())
    }
}
