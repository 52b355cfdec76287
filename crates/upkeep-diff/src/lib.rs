//! Diff engine for upkeep.
//!
//! Computes field-level differences between two instances of one record
//! shape, and key-level differences between two resource sets.
//!
//! # Key Types
//!
//! - [`Schema`] / [`FieldDescriptor`] -- Static per-type field tables
//! - [`Record`] -- Type-erased view the engine walks
//! - [`PropertyChange`] / [`ChangeKind`] -- One field-level change
//! - [`ResourceDiff`] / [`ResourceChange`] -- Resource set diff (`BTreeMap<String, Value>`)

pub mod error;
pub mod resource;
pub mod schema;
pub mod structural;

pub use error::{DiffError, DiffResult};
pub use resource::{diff_resources, ResourceChange, ResourceDiff, ResourceSet};
pub use schema::{Accessor, FieldDescriptor, FieldValue, FieldView, Record, Scalar, Schema};
pub use structural::{compare, compare_records, ChangeKind, PropertyChange, MAX_DEPTH};
