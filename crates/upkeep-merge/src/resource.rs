//! Replaying a resource-set diff onto another resource set.

use upkeep_diff::{ResourceChange, ResourceDiff, ResourceSet};

/// Apply `diff` to a copy of `target`.
///
/// Removed keys are dropped, added keys are inserted, modified keys take the
/// new value. A modified key that `target` no longer has is re-added.
pub fn merge_resources(diff: &ResourceDiff, target: &ResourceSet) -> ResourceSet {
    let mut merged = target.clone();
    for change in &diff.changes {
        match change {
            ResourceChange::Removed { key, .. } => {
                merged.remove(key);
            }
            ResourceChange::Added { key, value }
            | ResourceChange::Modified {
                key, new: value, ..
            } => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}
