//! Set difference helpers used to reconcile stores keyed by instance id.

use std::collections::HashSet;
use std::hash::Hash;

/// Items added, removed and kept between two snapshots of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T: Eq + Hash> {
    pub added: HashSet<T>,
    pub removed: HashSet<T>,
    pub common: HashSet<T>,
}

/// Compare `prev` with `curr`
///
/// `added` holds items only in `curr`, `removed` items only in `prev`.
#[must_use]
pub fn diff_sets<T>(prev: &HashSet<T>, curr: &HashSet<T>) -> SetDiff<T>
where
    T: Eq + Hash + Clone,
{
    let mut added = HashSet::new();
    let mut common = HashSet::new();
    for item in curr {
        if prev.contains(item) {
            common.insert(item.clone());
        } else {
            added.insert(item.clone());
        }
    }
    let removed = prev
        .iter()
        .filter(|item| !common.contains(*item))
        .cloned()
        .collect();

    SetDiff {
        added,
        removed,
        common,
    }
}
