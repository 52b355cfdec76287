//! Registry row identifiers and the insert-side row shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use upkeep_types::{Fingerprint, ReleaseVersion};

/// Store-assigned identifier of a registered bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(pub i64);

/// Store-assigned identifier of a registered project release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file row about to be registered.
///
/// Bundle and project are referenced by id; reads resolve them back into
/// [`upkeep_types::BundleInfo`] / [`upkeep_types::RegisteredProjectInfo`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFileRelease {
    pub path: String,
    pub file_name: String,
    pub version: ReleaseVersion,
    pub fingerprint: Fingerprint,
    pub bundle: Option<BundleId>,
    pub project: Option<ProjectId>,
}

impl NewFileRelease {
    /// A row for `path`, with the filename taken from its last segment.
    pub fn new(path: impl Into<String>, version: ReleaseVersion, fingerprint: Fingerprint) -> Self {
        let path = path.into();
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            path,
            file_name,
            version,
            fingerprint,
            bundle: None,
            project: None,
        }
    }

    pub fn in_bundle(mut self, bundle: BundleId) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn in_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }
}
