use serde::de::DeserializeOwned;
use upkeep_tree::{ProjectTree, TrackedFile};
use upkeep_types::FileRelease;

use crate::categories::{OrderedCollectionCategory, RelationshipCategory, ResourceCategory};
use crate::error::{UpgradeError, UpgradeResult};
use crate::report::UpgradeWarning;

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// The two trees every category decision looks at.
#[derive(Clone, Copy, Debug)]
pub struct Trees<'a> {
    /// The customized tree being upgraded.
    pub source: &'a ProjectTree,
    /// The stock tree `source` was built from.
    pub base: &'a ProjectTree,
}

impl<'a> Trees<'a> {
    pub fn new(source: &'a ProjectTree, base: &'a ProjectTree) -> Self {
        Self { source, base }
    }
}

// ---------------------------------------------------------------------------
// FileCategory trait
// ---------------------------------------------------------------------------

/// Per-file-kind knowledge the analyzer defers to.
///
/// Only the first category that [`belongs`](Self::belongs) to a file is asked
/// about its addition or modification. Merging is offered to any category
/// whose [`can_auto_merge`](Self::can_auto_merge) accepts the path.
pub trait FileCategory: Send + Sync {
    fn name(&self) -> &str;

    fn belongs(&self, file: &TrackedFile) -> bool;

    /// Whether a file unknown to the registry is a real customer addition.
    fn is_valid_addition(
        &self,
        _file: &TrackedFile,
        _trees: &Trees<'_>,
        _warnings: &mut Vec<UpgradeWarning>,
    ) -> UpgradeResult<bool> {
        Ok(true)
    }

    /// Whether a registered file whose bytes changed carries a customization
    /// worth merging.
    fn is_valid_modification(
        &self,
        _file: &TrackedFile,
        _trees: &Trees<'_>,
        _warnings: &mut Vec<UpgradeWarning>,
        _releases: &[FileRelease],
    ) -> UpgradeResult<bool> {
        Ok(true)
    }

    fn can_auto_merge(&self, _path: &str) -> bool {
        false
    }

    /// Fold the `base -> source` changes at `path` into `target`.
    fn apply_merge(
        &self,
        _path: &str,
        _trees: &Trees<'_>,
        _target: &ProjectTree,
    ) -> UpgradeResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CategoryRegistry
// ---------------------------------------------------------------------------

/// Ordered list of categories queried by first match.
pub struct CategoryRegistry {
    categories: Vec<Box<dyn FileCategory>>,
}

impl CategoryRegistry {
    /// An empty registry: every file is unclaimed.
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Relationships, ordered collections, then resources.
    pub fn with_default_categories() -> UpgradeResult<Self> {
        let mut registry = Self::new();
        registry.add(Box::new(RelationshipCategory::new()?));
        registry.add(Box::new(OrderedCollectionCategory));
        registry.add(Box::new(ResourceCategory));
        Ok(registry)
    }

    /// Append a category after the existing ones.
    pub fn add(&mut self, category: Box<dyn FileCategory>) {
        self.categories.push(category);
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name()).collect()
    }

    /// The first category that claims `file`.
    pub fn claim(&self, file: &TrackedFile) -> Option<&dyn FileCategory> {
        self.categories
            .iter()
            .find(|c| c.belongs(file))
            .map(|c| c.as_ref())
    }

    /// The first category able to merge `path`.
    pub fn merger(&self, path: &str) -> Option<&dyn FileCategory> {
        self.categories
            .iter()
            .find(|c| c.can_auto_merge(path))
            .map(|c| c.as_ref())
    }

    pub fn can_auto_merge(&self, path: &str) -> bool {
        self.merger(path).is_some()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CategoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRegistry")
            .field("categories", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the categories
// ---------------------------------------------------------------------------

pub(crate) fn ends_with_ignore_case(path: &str, suffix: &str) -> bool {
    let (path, suffix) = (path.as_bytes(), suffix.as_bytes());
    path.len() >= suffix.len() && path[path.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

pub(crate) fn parse_json<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> UpgradeResult<T> {
    serde_json::from_slice(bytes).map_err(|source| UpgradeError::Parse {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn read_json<T: DeserializeOwned>(tree: &ProjectTree, path: &str) -> UpgradeResult<T> {
    parse_json(path, &tree.read(path)?)
}
