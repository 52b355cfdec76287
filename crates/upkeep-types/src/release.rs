//! Release descriptors: bundles, projects, and the file rows pinned to them.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::version::ReleaseVersion;

/// An add-on package that can be applied on top of a project release.
///
/// Identity is the bundle **name only**: equality and hashing ignore the
/// package filename and the version. Two different versions of one bundle
/// therefore compare equal and collapse to a single entry in a set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BundleInfo {
    pub name: String,
    pub file_name: String,
    pub version: ReleaseVersion,
}

impl BundleInfo {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        version: ReleaseVersion,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            version,
        }
    }
}

impl PartialEq for BundleInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BundleInfo {}

impl Hash for BundleInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A registered baseline release of a project.
///
/// Identity is name plus version; the backup filename is informational.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredProjectInfo {
    pub name: String,
    pub backup_file_name: Option<String>,
    pub version: ReleaseVersion,
}

impl RegisteredProjectInfo {
    pub fn new(name: impl Into<String>, version: ReleaseVersion) -> Self {
        Self {
            name: name.into(),
            backup_file_name: None,
            version,
        }
    }

    /// Attach the backup package this release was registered from.
    pub fn with_backup(mut self, backup_file_name: impl Into<String>) -> Self {
        self.backup_file_name = Some(backup_file_name.into());
        self
    }
}

impl PartialEq for RegisteredProjectInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for RegisteredProjectInfo {}

impl Hash for RegisteredProjectInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

/// One registry row: a file path pinned to a fingerprint within one release
/// context.
///
/// The same path appears once per release it was shipped in; rows are never
/// rewritten once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRelease {
    /// Tree-relative path, `/`-separated.
    pub path: String,
    pub file_name: String,
    pub version: ReleaseVersion,
    pub fingerprint: Fingerprint,
    pub bundle: Option<BundleInfo>,
    pub project: Option<RegisteredProjectInfo>,
}

impl FileRelease {
    /// Whether the filename carries the given suffix, ignoring ASCII case.
    pub fn file_name_ends_with(&self, suffix: &str) -> bool {
        let name = self.file_name.as_bytes();
        let suffix = suffix.as_bytes();
        name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> ReleaseVersion {
        s.parse().unwrap()
    }

    #[test]
    fn bundle_equality_ignores_version() {
        // Two different releases of one bundle are the same bundle as far as
        // equality and hashing are concerned.
        let old = BundleInfo::new("Reporting", "reporting-1.zip", v("1.0.0.0"));
        let new = BundleInfo::new("Reporting", "reporting-2.zip", v("2.0.0.0"));
        assert_eq!(old, new);

        let set: HashSet<BundleInfo> = [old, new].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn bundles_with_different_names_differ() {
        let a = BundleInfo::new("A", "a.zip", v("1.0"));
        let b = BundleInfo::new("B", "a.zip", v("1.0"));
        assert_ne!(a, b);
    }

    #[test]
    fn project_identity_is_name_and_version() {
        let a = RegisteredProjectInfo::new("Portal", v("7.0")).with_backup("a.bak");
        let b = RegisteredProjectInfo::new("Portal", v("7.0")).with_backup("b.bak");
        let c = RegisteredProjectInfo::new("Portal", v("7.1"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn file_name_suffix_is_case_insensitive() {
        let row = FileRelease {
            path: "bin/Core.DLL".into(),
            file_name: "Core.DLL".into(),
            version: v("1.0"),
            fingerprint: Fingerprint::from_hash([0; 32]),
            bundle: None,
            project: None,
        };
        assert!(row.file_name_ends_with(".dll"));
        assert!(!row.file_name_ends_with(".exe"));
        assert!(!row.file_name_ends_with("much-longer-than-the-name.dll"));
    }
}
