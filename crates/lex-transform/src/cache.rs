//! Generation-stamped node identity for cached transform values.

use std::collections::HashMap;
use std::sync::Arc;

use lex_tree::ContextRef;

/// Caches transformed values keyed by node identity across rebuilds.
///
/// `lex-tree::Context` is plain owned data with no stable heap address to
/// weakly reference, so identity here is a node's index path paired with a
/// generation counter. `invalidate` bumps the generation of a node and
/// every one of its ancestors; a later lookup against the old generation
/// simply misses, which is the eviction spec §9 asks for without needing
/// every context boxed behind a `Weak` pointer.
#[derive(Debug)]
pub struct TransformCache<V> {
    generations: HashMap<ContextRef, u64>,
    entries: HashMap<(ContextRef, u64), Arc<V>>,
}

impl<V> Default for TransformCache<V> {
    fn default() -> Self {
        Self { generations: HashMap::new(), entries: HashMap::new() }
    }
}

impl<V> TransformCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn generation_of(&self, path: &[usize]) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn get(&self, path: &[usize]) -> Option<Arc<V>> {
        let generation = self.generation_of(path);
        self.entries.get(&(path.to_vec(), generation)).cloned()
    }

    pub(crate) fn insert(&mut self, path: ContextRef, value: Arc<V>) {
        let generation = self.generation_of(&path);
        self.entries.insert((path, generation), value);
    }

    /// Evicts `path` and every one of its ancestors, including the root
    /// (the empty path), from the cache.
    pub fn invalidate(&mut self, path: &[usize]) {
        tracing::trace!(?path, "invalidating cached transform for node and its ancestors");
        for len in (0..=path.len()).rev() {
            let prefix = path[..len].to_vec();
            let generation = self.generations.entry(prefix.clone()).or_insert(0);
            let stale = *generation;
            *generation += 1;
            self.entries.remove(&(prefix, stale));
        }
    }

    /// Number of live cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_evicts_the_node_and_its_ancestors() {
        let mut cache: TransformCache<i32> = TransformCache::new();
        cache.insert(vec![], Arc::new(0));
        cache.insert(vec![0], Arc::new(1));
        cache.insert(vec![0, 1], Arc::new(2));
        cache.insert(vec![2], Arc::new(3));

        cache.invalidate(&[0, 1]);

        assert!(cache.get(&[0, 1]).is_none());
        assert!(cache.get(&[0]).is_none());
        assert!(cache.get(&[]).is_none());
        assert_eq!(*cache.get(&[2]).unwrap(), 3);
    }

    #[test]
    fn reinserting_after_invalidate_uses_the_bumped_generation() {
        let mut cache: TransformCache<i32> = TransformCache::new();
        cache.insert(vec![0], Arc::new(1));
        cache.invalidate(&[0]);
        cache.insert(vec![0], Arc::new(9));

        assert_eq!(*cache.get(&[0]).unwrap(), 9);
    }
}
