//! Three-way merge of ordered, identity-keyed collections.
//!
//! Items are `(key, value)` pairs; keys are stable identities, values are
//! display or file names. A merge first decides which branch owns the order:
//! if `source` moved any item that it shares with `base`, source order wins and
//! target's edits are replayed onto it. Otherwise source's edits are replayed
//! onto target. Insertions are positioned by their neighbours at diff time,
//! never by absolute index.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MergeError, MergeResult};

/// One entry of an ordered collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderedItem {
    pub key: String,
    pub value: String,
}

impl OrderedItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single edit between two versions of a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionDiff {
    /// A new item, with the keys of its neighbours where it was found.
    Add {
        key: String,
        value: String,
        predecessor: Option<String>,
        successor: Option<String>,
    },
    Remove {
        key: String,
        value: String,
    },
    /// Same key, different value.
    Rename {
        key: String,
        value: String,
    },
}

fn position(list: &[OrderedItem], key: &str) -> Option<usize> {
    list.iter().position(|item| item.key == key)
}

fn ensure_unique(list: &[OrderedItem], side: &'static str) -> MergeResult<()> {
    let mut seen = HashSet::with_capacity(list.len());
    for item in list {
        if !seen.insert(item.key.as_str()) {
            return Err(MergeError::DuplicateKey {
                key: item.key.clone(),
                side,
            });
        }
    }
    Ok(())
}

/// Edits that turn `previous` into `current`: adds (in `current` order),
/// then removes (in `previous` order), then renames (in `current` order).
pub fn compare_ordered(current: &[OrderedItem], previous: &[OrderedItem]) -> Vec<CollectionDiff> {
    let before: HashMap<&str, &str> = previous
        .iter()
        .map(|item| (item.key.as_str(), item.value.as_str()))
        .collect();
    let now: HashSet<&str> = current.iter().map(|item| item.key.as_str()).collect();

    let mut adds = Vec::new();
    let mut renames = Vec::new();
    for (i, item) in current.iter().enumerate() {
        match before.get(item.key.as_str()) {
            None => adds.push(CollectionDiff::Add {
                key: item.key.clone(),
                value: item.value.clone(),
                predecessor: i.checked_sub(1).map(|p| current[p].key.clone()),
                successor: current.get(i + 1).map(|s| s.key.clone()),
            }),
            Some(old) if *old != item.value => renames.push(CollectionDiff::Rename {
                key: item.key.clone(),
                value: item.value.clone(),
            }),
            Some(_) => {}
        }
    }
    let removes = previous
        .iter()
        .filter(|item| !now.contains(item.key.as_str()))
        .map(|item| CollectionDiff::Remove {
            key: item.key.clone(),
            value: item.value.clone(),
        });

    let mut out = adds;
    out.extend(removes);
    out.extend(renames);
    out
}

/// Replay one edit onto `list`.
///
/// Removing an absent key and renaming an absent key are no-ops. An add
/// whose key is already present is skipped so keys stay unique. Otherwise
/// the item goes in front of its successor, else right after its
/// predecessor, else at the end.
pub fn apply_change(list: &mut Vec<OrderedItem>, change: &CollectionDiff) {
    match change {
        CollectionDiff::Remove { key, .. } => {
            if let Some(i) = position(list, key) {
                list.remove(i);
            }
        }
        CollectionDiff::Rename { key, value } => {
            if let Some(i) = position(list, key) {
                list[i].value = value.clone();
            }
        }
        CollectionDiff::Add {
            key,
            value,
            predecessor,
            successor,
        } => {
            if position(list, key).is_some() {
                return;
            }
            let item = OrderedItem::new(key.clone(), value.clone());
            let at_successor = successor.as_deref().and_then(|s| position(list, s));
            let after_predecessor = predecessor
                .as_deref()
                .and_then(|p| position(list, p))
                .map(|i| i + 1);
            match at_successor.or(after_predecessor) {
                Some(i) => list.insert(i, item),
                None => list.push(item),
            }
        }
    }
}

/// Whether `source` changed the relative order of the items it shares
/// with `base`. Only keys are compared; a rename is not a reorder.
pub fn is_reordered(base: &[OrderedItem], source: &[OrderedItem]) -> bool {
    let in_base: HashSet<&str> = base.iter().map(|i| i.key.as_str()).collect();
    let in_source: HashSet<&str> = source.iter().map(|i| i.key.as_str()).collect();
    let source_order = source
        .iter()
        .map(|i| i.key.as_str())
        .filter(|k| in_base.contains(k));
    let base_order = base
        .iter()
        .map(|i| i.key.as_str())
        .filter(|k| in_source.contains(k));
    !source_order.eq(base_order)
}

/// Reconcile `source` and `target`, both derived from `base`.
///
/// When source reordered shared items, the result is `source` with target's
/// edits replayed; otherwise it is `target` with source's edits replayed.
/// None of the inputs is modified.
pub fn merge_three_way(
    base: &[OrderedItem],
    source: &[OrderedItem],
    target: &[OrderedItem],
) -> MergeResult<Vec<OrderedItem>> {
    ensure_unique(base, "base")?;
    ensure_unique(source, "source")?;
    ensure_unique(target, "target")?;

    let (edits, mut merged) = if is_reordered(base, source) {
        debug!("source reordered items; replaying target edits onto source");
        (compare_ordered(target, base), source.to_vec())
    } else {
        (compare_ordered(source, base), target.to_vec())
    };
    for edit in &edits {
        apply_change(&mut merged, edit);
    }
    debug!(edits = edits.len(), items = merged.len(), "ordered merge done");
    Ok(merged)
}
