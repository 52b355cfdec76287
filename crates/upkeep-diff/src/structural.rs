//! Structural diff: compare two instances of one record shape field by field.
//!
//! Fields are visited in declaration order. Scalars produce `Add`, `Change`
//! or `Remove`; nested records recurse under `<field>.`; sequences of records
//! of equal length recurse element-wise under `<field>[<index>].`, while a
//! length change is reported as one coarse `Change` of the whole sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DiffError, DiffResult};
use crate::schema::{FieldValue, Record, Schema};

/// Deepest nesting accepted before the walk gives up.
pub const MAX_DEPTH: usize = 64;

/// Kind of field-level change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Present now, absent before.
    Add,
    /// Present on both sides with different values.
    Change,
    /// Absent now, present before.
    Remove,
}

/// One field-level difference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// Qualified field path, e.g. `owner.name` or `columns[2].id`.
    pub path: String,
    pub kind: ChangeKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl PropertyChange {
    fn added(path: String, new: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Add,
            old: None,
            new: Some(new),
        }
    }

    fn removed(path: String, old: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Remove,
            old: Some(old),
            new: None,
        }
    }

    fn changed(path: String, old: Value, new: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Change,
            old: Some(old),
            new: Some(new),
        }
    }

    /// The same change seen from the other side: adds become removes and
    /// old/new swap.
    pub fn mirrored(&self) -> Self {
        Self {
            path: self.path.clone(),
            kind: match self.kind {
                ChangeKind::Add => ChangeKind::Remove,
                ChangeKind::Remove => ChangeKind::Add,
                ChangeKind::Change => ChangeKind::Change,
            },
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}

/// Compare two records of the same type.
pub fn compare<T: Schema>(current: &T, previous: &T) -> DiffResult<Vec<PropertyChange>> {
    compare_records(current, previous)
}

/// Compare two type-erased records. Both must report the same schema name.
pub fn compare_records(
    current: &dyn Record,
    previous: &dyn Record,
) -> DiffResult<Vec<PropertyChange>> {
    let mut changes = Vec::new();
    walk(current, previous, "", 0, &mut changes)?;
    Ok(changes)
}

fn walk(
    current: &dyn Record,
    previous: &dyn Record,
    prefix: &str,
    depth: usize,
    out: &mut Vec<PropertyChange>,
) -> DiffResult<()> {
    let here = || prefix.trim_end_matches('.').to_string();
    if depth > MAX_DEPTH {
        return Err(DiffError::DepthExceeded {
            path: here(),
            limit: MAX_DEPTH,
        });
    }
    let mismatch = || DiffError::ShapeMismatch {
        path: here(),
        current: current.schema_name(),
        previous: previous.schema_name(),
    };
    if current.schema_name() != previous.schema_name() {
        return Err(mismatch());
    }

    let now = current.fields();
    let before = previous.fields();
    if now.len() != before.len() {
        return Err(mismatch());
    }

    for (n, b) in now.iter().zip(&before) {
        if !n.comparable {
            continue;
        }
        let path = format!("{prefix}{}", n.name);
        match (&n.value, &b.value) {
            (FieldValue::Scalar(a), FieldValue::Scalar(b)) => match (a, b) {
                (Some(a), Some(b)) if !a.same_as(b) => {
                    out.push(PropertyChange::changed(path, b.to_json(), a.to_json()))
                }
                (Some(a), None) => out.push(PropertyChange::added(path, a.to_json())),
                (None, Some(b)) => out.push(PropertyChange::removed(path, b.to_json())),
                _ => {}
            },
            (FieldValue::Record(a), FieldValue::Record(b)) => match (a, b) {
                (Some(a), Some(b)) => walk(*a, *b, &format!("{path}."), depth + 1, out)?,
                (Some(a), None) => out.push(PropertyChange::added(path, a.snapshot())),
                (None, Some(b)) => out.push(PropertyChange::removed(path, b.snapshot())),
                (None, None) => {}
            },
            (FieldValue::Sequence(a), FieldValue::Sequence(b)) => match (a, b) {
                (Some(a), Some(b)) if a.len() != b.len() => {
                    out.push(PropertyChange::changed(path, snapshot_all(b), snapshot_all(a)))
                }
                (Some(a), Some(b)) => {
                    for (i, (x, y)) in a.iter().zip(b).enumerate() {
                        walk(*x, *y, &format!("{path}[{i}]."), depth + 1, out)?;
                    }
                }
                (Some(a), None) => out.push(PropertyChange::added(path, snapshot_all(a))),
                (None, Some(b)) => out.push(PropertyChange::removed(path, snapshot_all(b))),
                (None, None) => {}
            },
            _ => return Err(mismatch()),
        }
    }
    Ok(())
}

fn snapshot_all(items: &[&dyn Record]) -> Value {
    Value::Array(items.iter().map(|r| r.snapshot()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Accessor, FieldDescriptor, Scalar};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    #[derive(Clone, Debug)]
    struct Owner {
        name: String,
    }

    #[derive(Clone, Debug)]
    struct Column {
        id: Uuid,
        name: String,
        nullable: bool,
    }

    #[derive(Clone, Debug)]
    struct Table {
        name: String,
        description: Option<String>,
        modified: chrono::DateTime<Utc>,
        owner: Option<Owner>,
        columns: Option<Vec<Column>>,
        cache_key: u64,
    }

    impl Schema for Owner {
        const NAME: &'static str = "Owner";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor::new(
            "name",
            Accessor::Scalar(|o: &Owner| Some(Scalar::Text(o.name.clone()))),
        )];
    }

    impl Schema for Column {
        const NAME: &'static str = "Column";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[
            FieldDescriptor::new("id", Accessor::Scalar(|c: &Column| Some(Scalar::Id(c.id)))),
            FieldDescriptor::new(
                "name",
                Accessor::Scalar(|c: &Column| Some(Scalar::Text(c.name.clone()))),
            ),
            FieldDescriptor::new(
                "nullable",
                Accessor::Scalar(|c: &Column| Some(Scalar::Bool(c.nullable))),
            ),
        ];
    }

    impl Schema for Table {
        const NAME: &'static str = "Table";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[
            FieldDescriptor::new(
                "name",
                Accessor::Scalar(|t: &Table| Some(Scalar::Text(t.name.clone()))),
            ),
            FieldDescriptor::new(
                "description",
                Accessor::Scalar(|t: &Table| t.description.clone().map(Scalar::Text)),
            ),
            FieldDescriptor::new(
                "modified",
                Accessor::Scalar(|t: &Table| Some(Scalar::Timestamp(t.modified))),
            ),
            FieldDescriptor::new(
                "owner",
                Accessor::Record(|t: &Table| t.owner.as_ref().map(|o| o as &dyn Record)),
            ),
            FieldDescriptor::new(
                "columns",
                Accessor::Sequence(|t: &Table| {
                    t.columns
                        .as_ref()
                        .map(|cs| cs.iter().map(|c| c as &dyn Record).collect())
                }),
            ),
            FieldDescriptor::skipped(
                "cache_key",
                Accessor::Scalar(|t: &Table| Some(Scalar::Int(t.cache_key as i64))),
            ),
        ];
    }

    fn column(n: u128, name: &str) -> Column {
        Column {
            id: Uuid::from_u128(n),
            name: name.into(),
            nullable: false,
        }
    }

    fn table() -> Table {
        Table {
            name: "Orders".into(),
            description: None,
            modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            owner: Some(Owner {
                name: "sales".into(),
            }),
            columns: Some(vec![column(1, "Id"), column(2, "Total")]),
            cache_key: 7,
        }
    }

    // ---------------------------------------------------------------
    // Scalars
    // ---------------------------------------------------------------

    #[test]
    fn identical_records_have_no_changes() {
        assert!(compare(&table(), &table()).unwrap().is_empty());
    }

    #[test]
    fn scalar_change_records_old_and_new() {
        let previous = table();
        let mut current = table();
        current.name = "SalesOrders".into();

        let changes = compare(&current, &previous).unwrap();
        assert_eq!(
            changes,
            vec![PropertyChange {
                path: "name".into(),
                kind: ChangeKind::Change,
                old: Some(json!("Orders")),
                new: Some(json!("SalesOrders")),
            }]
        );
    }

    #[test]
    fn presence_changes_are_add_and_remove() {
        let previous = table();
        let mut current = table();
        current.description = Some(String::new());

        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Add);
        assert_eq!(changes[0].new, Some(json!("")));

        let back = compare(&previous, &current).unwrap();
        assert_eq!(back[0].kind, ChangeKind::Remove);
    }

    #[test]
    fn timestamps_compare_exactly() {
        let previous = table();
        let mut current = table();
        current.modified = previous.modified + chrono::Duration::milliseconds(1);
        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes[0].path, "modified");
        assert_eq!(changes[0].old, Some(json!("2024-05-01T12:00:00Z")));
    }

    #[test]
    fn non_comparable_fields_are_skipped() {
        let previous = table();
        let mut current = table();
        current.cache_key = 99;
        assert!(compare(&current, &previous).unwrap().is_empty());
    }

    // ---------------------------------------------------------------
    // Nested records and sequences
    // ---------------------------------------------------------------

    #[test]
    fn nested_record_changes_are_prefixed() {
        let previous = table();
        let mut current = table();
        current.owner = Some(Owner {
            name: "finance".into(),
        });
        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes[0].path, "owner.name");
    }

    #[test]
    fn nested_record_absent_on_one_side() {
        let previous = table();
        let mut current = table();
        current.owner = None;
        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "owner");
        assert_eq!(changes[0].kind, ChangeKind::Remove);
        assert_eq!(changes[0].old, Some(json!({"name": "sales"})));
    }

    #[test]
    fn equal_length_sequences_diff_element_wise() {
        let previous = table();
        let mut current = table();
        current.columns.as_mut().unwrap()[1].name = "GrandTotal".into();
        current.columns.as_mut().unwrap()[1].nullable = true;

        let paths: Vec<_> = compare(&current, &previous)
            .unwrap()
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(paths, ["columns[1].name", "columns[1].nullable"]);
    }

    #[test]
    fn length_change_is_one_coarse_change() {
        let previous = table();
        let mut current = table();
        current.columns.as_mut().unwrap().push(column(3, "Tax"));
        current.columns.as_mut().unwrap()[0].name = "Key".into();

        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "columns");
        assert_eq!(changes[0].kind, ChangeKind::Change);
        assert_eq!(changes[0].new.as_ref().unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn sequence_absent_on_one_side() {
        let previous = table();
        let mut current = table();
        current.columns = None;
        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes[0].kind, ChangeKind::Remove);
        assert_eq!(changes[0].path, "columns");
    }

    #[test]
    fn empty_and_absent_sequences_differ() {
        let mut previous = table();
        previous.columns = None;
        let mut current = table();
        current.columns = Some(Vec::new());
        let changes = compare(&current, &previous).unwrap();
        assert_eq!(changes[0].kind, ChangeKind::Add);
        assert_eq!(changes[0].new, Some(json!([])));
    }

    // ---------------------------------------------------------------
    // Failure modes
    // ---------------------------------------------------------------

    struct Chain {
        next: Option<Box<Chain>>,
    }

    impl Schema for Chain {
        const NAME: &'static str = "Chain";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor::new(
            "next",
            Accessor::Record(|c: &Chain| c.next.as_deref().map(|n| n as &dyn Record)),
        )];
    }

    fn chain(len: usize) -> Chain {
        (0..len).fold(Chain { next: None }, |acc, _| Chain {
            next: Some(Box::new(acc)),
        })
    }

    #[test]
    fn deep_nesting_fails_closed() {
        let a = chain(MAX_DEPTH + 5);
        let b = chain(MAX_DEPTH + 5);
        let err = compare(&a, &b).unwrap_err();
        assert!(matches!(err, DiffError::DepthExceeded { limit, .. } if limit == MAX_DEPTH));
    }

    #[test]
    fn nesting_within_limit_is_fine() {
        assert!(compare(&chain(MAX_DEPTH), &chain(MAX_DEPTH)).unwrap().is_empty());
    }

    #[test]
    fn different_shapes_are_rejected() {
        let owner = Owner { name: "x".into() };
        let err = compare_records(&table(), &owner).unwrap_err();
        assert_eq!(
            err,
            DiffError::ShapeMismatch {
                path: String::new(),
                current: "Table",
                previous: "Owner",
            }
        );
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    fn arb_table() -> impl Strategy<Value = Table> {
        (
            "[a-c]{1,2}",
            proptest::option::of("[a-c]{0,2}"),
            proptest::option::of("[a-c]{1,2}"),
            proptest::option::of(proptest::collection::vec(("[a-c]{1,2}", any::<bool>()), 0..3)),
            0i64..3,
        )
            .prop_map(|(name, description, owner, columns, minutes)| Table {
                name,
                description,
                modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(minutes),
                owner: owner.map(|name| Owner { name }),
                columns: columns.map(|cs| {
                    cs.into_iter()
                        .enumerate()
                        .map(|(i, (name, nullable))| Column {
                            id: Uuid::from_u128(i as u128),
                            name,
                            nullable,
                        })
                        .collect()
                }),
                cache_key: 0,
            })
    }

    proptest! {
        #[test]
        fn compare_is_reflexive(t in arb_table()) {
            prop_assert!(compare(&t, &t).unwrap().is_empty());
        }

        #[test]
        fn compare_is_symmetric(a in arb_table(), b in arb_table()) {
            let forward = compare(&a, &b).unwrap();
            let backward = compare(&b, &a).unwrap();
            let mirrored: Vec<_> = forward.iter().map(PropertyChange::mirrored).collect();
            prop_assert_eq!(backward, mirrored);
        }
    }
}
