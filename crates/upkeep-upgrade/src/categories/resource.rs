//! Key/value resource sets (`*.resources.json`).

use tracing::debug;
use upkeep_diff::{diff_resources, ResourceSet};
use upkeep_merge::merge_resources;
use upkeep_tree::{ProjectTree, TrackedFile};
use upkeep_types::FileRelease;

use crate::category::{ends_with_ignore_case, read_json, FileCategory, Trees};
use crate::error::{UpgradeError, UpgradeResult};
use crate::report::UpgradeWarning;

const RESOURCE_SUFFIX: &str = ".resources.json";

#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceCategory;

impl ResourceCategory {
    fn is_resource_file(path: &str) -> bool {
        ends_with_ignore_case(path, RESOURCE_SUFFIX)
    }
}

impl FileCategory for ResourceCategory {
    fn name(&self) -> &str {
        "resource"
    }

    fn belongs(&self, file: &TrackedFile) -> bool {
        Self::is_resource_file(&file.path)
    }

    /// Reformatting alone does not count.
    fn is_valid_modification(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        _warnings: &mut Vec<UpgradeWarning>,
        _releases: &[FileRelease],
    ) -> UpgradeResult<bool> {
        if !trees.base.exists(&file.path)? {
            return Ok(true);
        }
        let current: ResourceSet = read_json(trees.source, &file.path)?;
        let previous: ResourceSet = read_json(trees.base, &file.path)?;
        Ok(!diff_resources(&current, &previous).is_empty())
    }

    fn can_auto_merge(&self, path: &str) -> bool {
        Self::is_resource_file(path)
    }

    fn apply_merge(
        &self,
        path: &str,
        trees: &Trees<'_>,
        target: &ProjectTree,
    ) -> UpgradeResult<()> {
        let current: ResourceSet = read_json(trees.source, path)?;
        let previous: ResourceSet = read_json(trees.base, path)?;
        let existing: ResourceSet = if target.exists(path)? {
            read_json(target, path)?
        } else {
            ResourceSet::new()
        };

        let diff = diff_resources(&current, &previous);
        let merged = merge_resources(&diff, &existing);
        debug!(path, changes = diff.len(), "resource set merged");
        let bytes = serde_json::to_vec_pretty(&merged).map_err(|source| UpgradeError::Parse {
            path: path.to_string(),
            source,
        })?;
        target.write(path, &bytes)?;
        Ok(())
    }
}
