//! Ordered collections (navigation menus, page groups) plus the package files
//! that ship alongside them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use upkeep_merge::{merge_three_way, OrderedItem};
use upkeep_tree::{ProjectTree, TrackedFile};
use upkeep_types::FileRelease;

use crate::category::{ends_with_ignore_case, parse_json, read_json, FileCategory, Trees};
use crate::error::{UpgradeError, UpgradeResult};
use crate::report::UpgradeWarning;

const ORDER_SUFFIX: &str = ".order.json";
const SUPPORT_FILES_DEFINITION: &str = "SupportFiles.def.json";
const BINARY_SUFFIXES: &[&str] = &[".dll", ".exe"];

/// On-disk shape of an `*.order.json` file.
///
/// Keys other than `items` are kept as they are in the target.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFile {
    pub items: Vec<OrderEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub file_name: String,
}

impl OrderFile {
    pub fn to_items(&self) -> Vec<OrderedItem> {
        self.items
            .iter()
            .map(|e| OrderedItem::new(e.id.clone(), e.file_name.clone()))
            .collect()
    }

    pub fn set_items(&mut self, items: Vec<OrderedItem>) {
        self.items = items
            .into_iter()
            .map(|i| OrderEntry {
                id: i.key,
                file_name: i.value,
            })
            .collect();
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedCollectionCategory;

impl OrderedCollectionCategory {
    fn is_order_file(path: &str) -> bool {
        ends_with_ignore_case(path, ORDER_SUFFIX)
    }

    fn is_binary(path: &str) -> bool {
        BINARY_SUFFIXES.iter().any(|s| ends_with_ignore_case(path, s))
    }

    fn is_support_definition(path: &str) -> bool {
        ends_with_ignore_case(path, SUPPORT_FILES_DEFINITION)
    }
}

impl FileCategory for OrderedCollectionCategory {
    fn name(&self) -> &str {
        "ordered-collection"
    }

    fn belongs(&self, file: &TrackedFile) -> bool {
        Self::is_order_file(&file.path)
            || Self::is_binary(&file.path)
            || Self::is_support_definition(&file.path)
    }

    fn is_valid_addition(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        _warnings: &mut Vec<UpgradeWarning>,
    ) -> UpgradeResult<bool> {
        // Present in base but unregistered: a bundle install created it.
        if Self::is_order_file(&file.path) {
            return Ok(!trees.base.exists(&file.path)?);
        }
        Ok(true)
    }

    fn is_valid_modification(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        warnings: &mut Vec<UpgradeWarning>,
        _releases: &[FileRelease],
    ) -> UpgradeResult<bool> {
        if Self::is_binary(&file.path) {
            warnings.push(UpgradeWarning::new(
                &file.path,
                "unknown version of a stock assembly",
            ));
            return Ok(false);
        }
        if Self::is_support_definition(&file.path) {
            return Ok(false);
        }
        if Self::is_order_file(&file.path) {
            return match trees.base.file(&file.path)? {
                Some(base_file) => Ok(file.fingerprint()? != base_file.fingerprint()?),
                None => Ok(true),
            };
        }
        Ok(true)
    }

    fn can_auto_merge(&self, path: &str) -> bool {
        Self::is_order_file(path)
    }

    fn apply_merge(
        &self,
        path: &str,
        trees: &Trees<'_>,
        target: &ProjectTree,
    ) -> UpgradeResult<()> {
        if !target.exists(path)? {
            debug!(path, "order file missing from target; copying source");
            target.copy_from(trees.source, path)?;
            return Ok(());
        }
        let base: OrderFile = read_json(trees.base, path)?;
        let source: OrderFile = read_json(trees.source, path)?;
        let mut merged: OrderFile = parse_json(path, &target.read(path)?)?;

        let items = merge_three_way(&base.to_items(), &source.to_items(), &merged.to_items())?;
        debug!(path, items = items.len(), "order file merged");
        merged.set_items(items);
        let bytes = serde_json::to_vec_pretty(&merged).map_err(|source| UpgradeError::Parse {
            path: path.to_string(),
            source,
        })?;
        target.write(path, &bytes)?;
        Ok(())
    }
}
