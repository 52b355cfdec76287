//! Upgrade analysis results.

use serde::{Deserialize, Serialize};

/// A note for the operator about a single file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeWarning {
    /// Tree-relative path the warning is about.
    pub path: String,
    pub message: String,
}

impl UpgradeWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UpgradeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Classification of a customized tree against its baseline.
///
/// Paths appear in tree order. A path is in at most one of the three lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeReport {
    /// Files unknown to the registry: customer additions.
    pub added: Vec<String>,
    /// Customized stock files a category can merge on its own.
    pub auto_mergeable: Vec<String>,
    /// Customized stock files that need a person.
    pub manual_merge: Vec<String>,
    pub warnings: Vec<UpgradeWarning>,
}

impl UpgradeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the source tree carries no customizations.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.auto_mergeable.is_empty() && self.manual_merge.is_empty()
    }

    /// Total number of classified paths.
    pub fn total_entries(&self) -> usize {
        self.added.len() + self.auto_mergeable.len() + self.manual_merge.len()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub(crate) fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(UpgradeWarning::new(path, message));
    }
}
