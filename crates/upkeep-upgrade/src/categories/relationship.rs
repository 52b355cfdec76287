//! Entity-relationship model files.
//!
//! A relationship is stored as `<Parent>.<Child>.<id>.relationship.json`.
//! Renaming an entity renames the file, so a relationship that looks added or
//! modified by path may be a stock one under a new name; the id settles it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use upkeep_diff::{compare, Accessor, FieldDescriptor, PropertyChange, Record, Scalar, Schema};
use upkeep_tree::{ProjectTree, TrackedFile};
use upkeep_types::FileRelease;
use uuid::Uuid;

use crate::category::{ends_with_ignore_case, read_json, FileCategory, Trees};
use crate::error::{UpgradeError, UpgradeResult};
use crate::report::UpgradeWarning;

const RELATIONSHIP_SUFFIX: &str = ".relationship.json";
const DELETED_ITEMS: &str = "Deleted Items/";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

/// A column pair joining parent and child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipColumn {
    /// Regenerated whenever the model is re-saved.
    pub id: Uuid,
    pub parent_column: String,
    pub child_column: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub parent_entity_id: Uuid,
    pub child_entity_id: Uuid,
    pub parent_property: String,
    pub child_property: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub cascade_delete: bool,
    #[serde(default)]
    pub columns: Vec<RelationshipColumn>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_modified_utc: Option<DateTime<Utc>>,
}

impl Schema for RelationshipColumn {
    const NAME: &'static str = "RelationshipColumn";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor::new("id", Accessor::Scalar(|c: &Self| Some(Scalar::Id(c.id)))),
        FieldDescriptor::new(
            "parent_column",
            Accessor::Scalar(|c: &Self| Some(Scalar::Text(c.parent_column.clone()))),
        ),
        FieldDescriptor::new(
            "child_column",
            Accessor::Scalar(|c: &Self| Some(Scalar::Text(c.child_column.clone()))),
        ),
    ];
}

impl Schema for Relationship {
    const NAME: &'static str = "Relationship";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor::new("id", Accessor::Scalar(|r: &Self| Some(Scalar::Id(r.id)))),
        FieldDescriptor::new(
            "parent_entity_id",
            Accessor::Scalar(|r: &Self| Some(Scalar::Id(r.parent_entity_id))),
        ),
        FieldDescriptor::new(
            "child_entity_id",
            Accessor::Scalar(|r: &Self| Some(Scalar::Id(r.child_entity_id))),
        ),
        FieldDescriptor::new(
            "parent_property",
            Accessor::Scalar(|r: &Self| Some(Scalar::Text(r.parent_property.clone()))),
        ),
        FieldDescriptor::new(
            "child_property",
            Accessor::Scalar(|r: &Self| Some(Scalar::Text(r.child_property.clone()))),
        ),
        FieldDescriptor::new(
            "cardinality",
            Accessor::Scalar(|r: &Self| Some(Scalar::Enum(r.cardinality.as_str().to_string()))),
        ),
        FieldDescriptor::new(
            "cascade_delete",
            Accessor::Scalar(|r: &Self| Some(Scalar::Bool(r.cascade_delete))),
        ),
        FieldDescriptor::new(
            "columns",
            Accessor::Sequence(|r: &Self| {
                Some(r.columns.iter().map(|c| c as &dyn Record).collect())
            }),
        ),
        FieldDescriptor::new(
            "description",
            Accessor::Scalar(|r: &Self| r.description.clone().map(Scalar::Text)),
        ),
        FieldDescriptor::new(
            "last_modified_utc",
            Accessor::Scalar(|r: &Self| r.last_modified_utc.map(Scalar::Timestamp)),
        ),
    ];
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Relationship files and anything under `Deleted Items/`.
///
/// Never auto-merged.
#[derive(Debug)]
pub struct RelationshipCategory {
    column_id: Regex,
}

impl RelationshipCategory {
    pub fn new() -> UpgradeResult<Self> {
        let column_id = Regex::new(r"^columns\[[0-9]*\]\.id$")
            .map_err(|e| UpgradeError::Config(e.to_string()))?;
        Ok(Self { column_id })
    }

    fn is_relationship(path: &str) -> bool {
        ends_with_ignore_case(path, RELATIONSHIP_SUFFIX)
    }

    fn is_deleted_item(path: &str) -> bool {
        path.len() >= DELETED_ITEMS.len()
            && path.as_bytes()[..DELETED_ITEMS.len()].eq_ignore_ascii_case(DELETED_ITEMS.as_bytes())
    }

    /// Changes that re-saving a model produces on its own.
    pub fn is_ignorable(&self, change: &PropertyChange) -> bool {
        change.path == "last_modified_utc" || self.column_id.is_match(&change.path)
    }

    /// The base relationship with `id`, looking at `path` first.
    fn find_in_base(
        &self,
        base: &ProjectTree,
        id: Uuid,
        path: &str,
    ) -> UpgradeResult<Option<(String, Relationship)>> {
        if let Some(file) = base.file(path)? {
            if let Ok(rel) = read_json::<Relationship>(base, &file.path) {
                if rel.id == id {
                    return Ok(Some((file.path, rel)));
                }
            }
        }
        for file in base.tracked_files()? {
            if !Self::is_relationship(&file.path) {
                continue;
            }
            match read_json::<Relationship>(base, &file.path) {
                Ok(rel) if rel.id == id => return Ok(Some((file.path, rel))),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %file.path, error = %e, "unreadable base relationship skipped")
                }
            }
        }
        Ok(None)
    }

    fn only_ignorable(
        &self,
        current: &Relationship,
        previous: &Relationship,
    ) -> UpgradeResult<bool> {
        let changes = compare(current, previous)?;
        Ok(changes.iter().all(|c| self.is_ignorable(c)))
    }

    /// A stock relationship under a new file name is never a fresh file;
    /// real edits on top of the rename need a person.
    fn check_renamed(
        &self,
        file: &TrackedFile,
        current: &Relationship,
        base_path: &str,
        previous: &Relationship,
        warnings: &mut Vec<UpgradeWarning>,
    ) -> UpgradeResult<()> {
        debug!(path = %file.path, base = base_path, "relationship was renamed");
        if !self.only_ignorable(current, previous)? {
            warnings.push(UpgradeWarning::new(
                &file.path,
                format!(
                    "stock relationship {base_path} was renamed and also modified; \
                     merge it manually"
                ),
            ));
        }
        Ok(())
    }
}

impl FileCategory for RelationshipCategory {
    fn name(&self) -> &str {
        "relationship"
    }

    fn belongs(&self, file: &TrackedFile) -> bool {
        Self::is_relationship(&file.path) || Self::is_deleted_item(&file.path)
    }

    fn is_valid_addition(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        warnings: &mut Vec<UpgradeWarning>,
    ) -> UpgradeResult<bool> {
        if !Self::is_relationship(&file.path) {
            return Ok(true);
        }
        let current: Relationship = read_json(trees.source, &file.path)?;
        match self.find_in_base(trees.base, current.id, &file.path)? {
            None => Ok(true),
            Some((base_path, previous)) => {
                self.check_renamed(file, &current, &base_path, &previous, warnings)?;
                Ok(false)
            }
        }
    }

    fn is_valid_modification(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        warnings: &mut Vec<UpgradeWarning>,
        _releases: &[FileRelease],
    ) -> UpgradeResult<bool> {
        if Self::is_deleted_item(&file.path) {
            return Ok(false);
        }
        if !Self::is_relationship(&file.path) {
            return Ok(true);
        }
        let current: Relationship = read_json(trees.source, &file.path)?;
        match self.find_in_base(trees.base, current.id, &file.path)? {
            None => Ok(true),
            Some((base_path, previous)) if base_path.eq_ignore_ascii_case(&file.path) => {
                Ok(!self.only_ignorable(&current, &previous)?)
            }
            Some((base_path, previous)) => {
                self.check_renamed(file, &current, &base_path, &previous, warnings)?;
                Ok(false)
            }
        }
    }
}
