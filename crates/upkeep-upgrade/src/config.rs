use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use upkeep_registry::DEFAULT_BATCH_SIZE;
use upkeep_tree::{ProjectTree, DEFAULT_IGNORE_PATTERNS};

use crate::error::{UpgradeError, UpgradeResult};

/// Settings shared by registration, identification and upgrade.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// SQLite file holding the release registry.
    pub registry_path: PathBuf,
    /// Rows per committed registration window.
    pub batch_size: usize,
    /// Filename suffix of the binaries that decide a project's version.
    pub package_binary_suffix: String,
    /// Tree-relative directory holding bundle manifests.
    pub manifest_dir: String,
    /// Gitignore-style patterns excluded from every tree.
    pub ignore_patterns: Vec<String>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("ProjectReleaseInfo.db"),
            batch_size: DEFAULT_BATCH_SIZE,
            package_binary_suffix: ".dll".into(),
            manifest_dir: "Bundle Manifests".into(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl UpgradeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> UpgradeResult<Self> {
        toml::from_str(text).map_err(|e| UpgradeError::Config(e.to_string()))
    }

    /// Read a TOML file. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> UpgradeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| UpgradeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// [`load`](Self::load) when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> UpgradeResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> UpgradeResult<String> {
        toml::to_string_pretty(self).map_err(|e| UpgradeError::Config(e.to_string()))
    }

    /// Open a tree with this configuration's ignore set.
    pub fn open_tree(&self, root: impl AsRef<Path>) -> UpgradeResult<ProjectTree> {
        Ok(ProjectTree::with_ignore_patterns(root, &self.ignore_patterns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = UpgradeConfig::default();
        assert_eq!(c.registry_path, PathBuf::from("ProjectReleaseInfo.db"));
        assert_eq!(c.batch_size, 100);
        assert_eq!(c.package_binary_suffix, ".dll");
        assert_eq!(c.manifest_dir, "Bundle Manifests");
        assert!(c.ignore_patterns.iter().any(|p| p == "modelindex.xml"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let c =
            UpgradeConfig::from_toml_str("batch_size = 25\nregistry_path = \"/tmp/r.db\"\n")
                .unwrap();
        assert_eq!(c.batch_size, 25);
        assert_eq!(c.registry_path, PathBuf::from("/tmp/r.db"));
        assert_eq!(c.manifest_dir, "Bundle Manifests");
    }

    #[test]
    fn toml_roundtrip() {
        let c = UpgradeConfig {
            ignore_patterns: vec!["*.bak".into()],
            ..Default::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(UpgradeConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UpgradeConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, UpgradeError::Config(_)));
        assert_eq!(UpgradeConfig::load_or_default(None).unwrap(), UpgradeConfig::default());
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(UpgradeConfig::from_toml_str("batch_size = \"many\"").is_err());
    }
}
