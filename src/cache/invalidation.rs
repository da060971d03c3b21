//! Transitive invalidation on top of the single-level store primitive

use crate::cache::store::CacheStore;
use crate::error::PolybuildResult;
use std::collections::{HashSet, VecDeque};

/// Invalidate `key` and everything that transitively depends on it.
///
/// Walks dependency links breadth-first by repeatedly calling
/// [`CacheStore::invalidate_dependents`]. Returns every removed key, `key`
/// first when it existed.
pub fn invalidate_cascade(store: &CacheStore, key: &str) -> PolybuildResult<Vec<String>> {
    let mut removed = Vec::new();
    if store.invalidate(key)? {
        removed.push(key.to_string());
    }

    let mut seen: HashSet<String> = HashSet::from([key.to_string()]);
    let mut queue = VecDeque::from([key.to_string()]);

    while let Some(current) = queue.pop_front() {
        for dependent in store.invalidate_dependents(&current)? {
            if seen.insert(dependent.clone()) {
                removed.push(dependent.clone());
                queue.push_back(dependent);
            }
        }
    }

    Ok(removed)
}
