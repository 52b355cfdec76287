//! Merge engine for upkeep.
//!
//! Implements three-way merge of ordered, identity-keyed collections with
//! reorder detection and anchor-based re-insertion, plus application of
//! resource-set diffs onto a target set.
//!
//! # Key Types
//!
//! - [`OrderedItem`] -- One `(key, value)` entry of an ordered collection
//! - [`CollectionDiff`] -- Add / Remove / Rename with insertion anchors
//! - [`merge_three_way`] -- Base/source/target reconciliation
//! - [`merge_resources`] -- Replay a [`upkeep_diff::ResourceDiff`] onto a target

pub mod error;
pub mod ordered;
pub mod resource;

pub use error::{MergeError, MergeResult};
pub use ordered::{
    apply_change, compare_ordered, is_reordered, merge_three_way, CollectionDiff, OrderedItem,
};
pub use resource::merge_resources;
