use crate::api::{Chunk, Group, KeyOrder};
use std::collections::HashMap;
use std::hash::Hash;

// The shuffle stage is deliberately single-threaded and pure: it sits between
// the two parallel regions and acts as the synchronization barrier. All three
// functions fully materialize their output.

/// Groups the merged entry collection by key equality. O(n) hash-based; the
/// resulting group sequence is in arbitrary order.
pub fn group_entries<K, V>(entries: Vec<(K, V)>) -> Vec<Group<K, V>>
where
    K: Hash + Eq,
{
    let mut by_key: HashMap<K, Vec<V>> = HashMap::new();
    for (key, value) in entries {
        by_key.entry(key).or_default().push(value);
    }
    by_key
        .into_iter()
        .map(|(key, values)| Group { key, values })
        .collect()
}

/// Sorts groups by key under the job-supplied total order. Keys are unique
/// after grouping, so there are no ties to break.
pub fn sort_groups<K, V>(groups: &mut [Group<K, V>], ordering: &KeyOrder<K>) {
    groups.sort_by(|a, b| ordering(&a.key, &b.key));
}

/// Partitions the sorted group sequence into consecutive windows of at most
/// `chunk_size` groups, preserving order. Indices are 1-based positions in
/// the partition sequence; the final chunk may be short.
pub fn chunk_groups<K, V>(groups: Vec<Group<K, V>>, chunk_size: usize) -> Vec<Chunk<K, V>> {
    debug_assert!(chunk_size > 0);
    let mut chunks: Vec<Chunk<K, V>> = Vec::with_capacity(groups.len().div_ceil(chunk_size));
    let mut window: Vec<Group<K, V>> = Vec::new();
    for group in groups {
        window.push(group);
        if window.len() == chunk_size {
            chunks.push(Chunk { index: chunks.len() + 1, groups: std::mem::take(&mut window) });
        }
    }
    if !window.is_empty() {
        chunks.push(Chunk { index: chunks.len() + 1, groups: window });
    }
    chunks
}
