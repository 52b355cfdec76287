//! Resource-set diff: compare two key/value resource bundles.
//!
//! A resource set maps resource keys to JSON values. The diff reports keys
//! that appeared, disappeared, or changed value, in key order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value resources, ordered by key.
pub type ResourceSet = BTreeMap<String, Value>;

/// The result of comparing two resource sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub changes: Vec<ResourceChange>,
}

impl ResourceDiff {
    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Keys touched by the diff, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(ResourceChange::key)
    }
}

/// A single change in a resource set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceChange {
    Added { key: String, value: Value },
    Removed { key: String, value: Value },
    Modified { key: String, old: Value, new: Value },
}

impl ResourceChange {
    pub fn key(&self) -> &str {
        match self {
            ResourceChange::Added { key, .. }
            | ResourceChange::Removed { key, .. }
            | ResourceChange::Modified { key, .. } => key,
        }
    }
}

/// Diff `current` against `previous`.
pub fn diff_resources(current: &ResourceSet, previous: &ResourceSet) -> ResourceDiff {
    let keys: BTreeSet<&String> = current.keys().chain(previous.keys()).collect();
    let changes = keys
        .into_iter()
        .filter_map(|key| match (current.get(key), previous.get(key)) {
            (Some(new), Some(old)) if new != old => Some(ResourceChange::Modified {
                key: key.clone(),
                old: old.clone(),
                new: new.clone(),
            }),
            (Some(value), None) => Some(ResourceChange::Added {
                key: key.clone(),
                value: value.clone(),
            }),
            (None, Some(value)) => Some(ResourceChange::Removed {
                key: key.clone(),
                value: value.clone(),
            }),
            _ => None,
        })
        .collect();
    ResourceDiff { changes }
}
