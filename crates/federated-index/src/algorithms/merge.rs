//! # Merge, Dedup and Paginate
//!
//! Combines per-source notification pages into one page:
//!
//! 1. Drop repeats of the same item, keeping the first occurrence.
//! 2. Stable sort by descending effective cursor.
//! 3. Truncate to the limit.
//!
//! Sources are concatenated in declaration order before merging, so when two
//! entries carry equal cursors the earlier source wins the tie.

use std::collections::HashSet;
use std::hash::Hash;

use crate::domain::{effective_cursor, NotificationEntry};

/// Keep the first occurrence of every key, preserving input order.
pub fn dedup_first_seen<T, K, F>(items: Vec<T>, mut key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(key_fn(item)))
        .collect()
}

/// Stable sort by descending effective cursor.
pub fn sort_by_cursor_desc(entries: &mut [NotificationEntry]) {
    entries.sort_by(|a, b| effective_cursor(&b.key).cmp(effective_cursor(&a.key)));
}

/// Dedup, sort and truncate a concatenation of source pages.
pub fn merge_page(entries: Vec<NotificationEntry>, limit: usize) -> Vec<NotificationEntry> {
    let mut page = dedup_first_seen(entries, |e| e.value.item_url.clone());
    sort_by_cursor_desc(&mut page);
    page.truncate(limit);
    page
}
