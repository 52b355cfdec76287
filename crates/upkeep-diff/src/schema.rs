//! Static field tables for diffable record types.
//!
//! A type becomes diffable by implementing [`Schema`]: a name and a
//! `'static` slice of [`FieldDescriptor`]s in declaration order. The blanket
//! [`Record`] impl erases the concrete type so nested records and sequences
//! of records can be walked uniformly.
//!
//! ```
//! use upkeep_diff::{Accessor, FieldDescriptor, Record, Scalar, Schema};
//!
//! struct Column {
//!     name: String,
//!     width: Option<i64>,
//! }
//!
//! impl Schema for Column {
//!     const NAME: &'static str = "Column";
//!     const FIELDS: &'static [FieldDescriptor<Self>] = &[
//!         FieldDescriptor::new("name", Accessor::Scalar(|c| Some(Scalar::Text(c.name.clone())))),
//!         FieldDescriptor::new("width", Accessor::Scalar(|c| c.width.map(Scalar::Int))),
//!     ];
//! }
//!
//! let col = Column { name: "Id".into(), width: None };
//! assert_eq!(col.schema_name(), "Column");
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// A leaf value as seen by the diff engine.
#[derive(Clone, Debug)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    /// Compared by bit pattern, so `NaN` equals itself and `0.0` differs
    /// from `-0.0`.
    Float(f64),
    /// Decimal kept in its canonical textual form.
    Decimal(String),
    Text(String),
    /// Enumerated value by variant name.
    Enum(String),
    Id(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Exact equality; no tolerance, no cross-variant coercion.
    pub fn same_as(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Decimal(a), Scalar::Decimal(b)) => a == b,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Enum(a), Scalar::Enum(b)) => a == b,
            (Scalar::Id(a), Scalar::Id(b)) => a == b,
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a == b,
            _ => false,
        }
    }

    /// JSON rendering used in change snapshots.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Scalar::Decimal(s) | Scalar::Text(s) | Scalar::Enum(s) => Value::String(s.clone()),
            Scalar::Id(id) => Value::String(id.to_string()),
            Scalar::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// How a field is read from its owner.
pub enum Accessor<T: 'static> {
    Scalar(fn(&T) -> Option<Scalar>),
    Record(fn(&T) -> Option<&dyn Record>),
    Sequence(fn(&T) -> Option<Vec<&dyn Record>>),
}

/// One entry of a type's field table.
pub struct FieldDescriptor<T: 'static> {
    pub name: &'static str,
    /// Non-comparable fields (generated or serialization-only) are skipped.
    pub comparable: bool,
    pub accessor: Accessor<T>,
}

impl<T: 'static> FieldDescriptor<T> {
    pub const fn new(name: &'static str, accessor: Accessor<T>) -> Self {
        Self {
            name,
            comparable: true,
            accessor,
        }
    }

    pub const fn skipped(name: &'static str, accessor: Accessor<T>) -> Self {
        Self {
            name,
            comparable: false,
            accessor,
        }
    }
}

/// A field's value read through its descriptor.
pub enum FieldValue<'a> {
    Scalar(Option<Scalar>),
    Record(Option<&'a dyn Record>),
    Sequence(Option<Vec<&'a dyn Record>>),
}

impl FieldValue<'_> {
    fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(s) => s.as_ref().map(Scalar::to_json).unwrap_or(Value::Null),
            FieldValue::Record(r) => r.map(|r| r.snapshot()).unwrap_or(Value::Null),
            FieldValue::Sequence(items) => items
                .as_ref()
                .map(|items| Value::Array(items.iter().map(|r| r.snapshot()).collect()))
                .unwrap_or(Value::Null),
        }
    }
}

/// A named field of a record instance.
pub struct FieldView<'a> {
    pub name: &'static str,
    pub comparable: bool,
    pub value: FieldValue<'a>,
}

/// Static description of a diffable record type.
pub trait Schema: Sized + 'static {
    const NAME: &'static str;
    const FIELDS: &'static [FieldDescriptor<Self>];
}

/// Type-erased record the diff engine walks.
pub trait Record {
    fn schema_name(&self) -> &'static str;

    /// Fields in declaration order.
    fn fields(&self) -> Vec<FieldView<'_>>;

    /// JSON snapshot of every field, comparable or not.
    fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .fields()
            .iter()
            .map(|f| (f.name.to_string(), f.value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl<T: Schema> Record for T {
    fn schema_name(&self) -> &'static str {
        T::NAME
    }

    fn fields(&self) -> Vec<FieldView<'_>> {
        T::FIELDS
            .iter()
            .map(|d| FieldView {
                name: d.name,
                comparable: d.comparable,
                value: match &d.accessor {
                    Accessor::Scalar(get) => FieldValue::Scalar(get(self)),
                    Accessor::Record(get) => FieldValue::Record(get(self)),
                    Accessor::Sequence(get) => FieldValue::Sequence(get(self)),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i64,
        label: Option<String>,
    }

    impl Schema for Point {
        const NAME: &'static str = "Point";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[
            FieldDescriptor::new("x", Accessor::Scalar(|p| Some(Scalar::Int(p.x)))),
            FieldDescriptor::skipped(
                "label",
                Accessor::Scalar(|p| p.label.clone().map(Scalar::Text)),
            ),
        ];
    }

    #[test]
    fn fields_follow_declaration_order() {
        let p = Point { x: 3, label: None };
        let names: Vec<_> = p.fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["x", "label"]);
        assert!(!p.fields()[1].comparable);
    }

    #[test]
    fn snapshot_includes_every_field() {
        let p = Point {
            x: 3,
            label: Some("origin".into()),
        };
        assert_eq!(p.snapshot(), serde_json::json!({"x": 3, "label": "origin"}));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert!(Scalar::Float(f64::NAN).same_as(&Scalar::Float(f64::NAN)));
        assert!(!Scalar::Float(0.0).same_as(&Scalar::Float(-0.0)));
        assert!(!Scalar::Float(0.1 + 0.2).same_as(&Scalar::Float(0.3)));
    }

    #[test]
    fn variants_never_cross_compare() {
        assert!(!Scalar::Text("1".into()).same_as(&Scalar::Decimal("1".into())));
        assert!(!Scalar::Int(1).same_as(&Scalar::Float(1.0)));
    }

    #[test]
    fn non_finite_floats_render_as_text() {
        assert_eq!(Scalar::Float(f64::INFINITY).to_json(), Value::String("inf".into()));
    }
}
