//! # Reaction / Thread Reconciler
//!
//! Merges what two sources recorded about the same subject. Both merges are
//! union-based, so re-merging a result with either input changes nothing.

use std::collections::BTreeMap;

use super::merge::dedup_first_seen;
use crate::domain::ItemRef;

/// Concatenate two lists and drop repeats, keeping first occurrences.
pub fn concat_uniq<T: Clone + Eq + std::hash::Hash>(a: &[T], b: &[T]) -> Vec<T> {
    dedup_first_seen(a.iter().chain(b).cloned().collect(), |v: &T| v.clone())
}

/// Key-wise union of two `tag -> voters` maps.
pub fn merge_reactions(
    first: Option<&BTreeMap<String, Vec<String>>>,
    second: Option<&BTreeMap<String, Vec<String>>>,
) -> BTreeMap<String, Vec<String>> {
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for source in [first, second].into_iter().flatten() {
        for (tag, voters) in source {
            let slot = merged.entry(tag.clone()).or_default();
            *slot = concat_uniq(slot, voters);
        }
    }
    merged
}

/// Combine two reply lists.
///
/// When only one source contributed its list is returned untouched; when
/// both did, replies are deduplicated by `db_url` in concatenation order.
pub fn merge_threads(first: Option<Vec<ItemRef>>, second: Option<Vec<ItemRef>>) -> Vec<ItemRef> {
    match (first, second) {
        (Some(a), Some(b)) => {
            let mut items = a;
            items.extend(b);
            dedup_first_seen(items, |item| item.db_url.clone())
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => Vec::new(),
    }
}
