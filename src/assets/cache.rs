use std::collections::HashMap;
use std::hash::Hash;

/// Loaded assets keyed by source path.
///
/// Setup after a teardown asks for the same height map and prefabs again;
/// those requests are answered from here without touching the disk.
pub struct AssetCache<K, V> {
    entries: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for AssetCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: Eq + Hash, V: Clone> AssetCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned entry for `key`, counted as a hit or a miss
    pub fn fetch(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_second_fetch_is_a_hit() {
        let mut cache: AssetCache<PathBuf, Arc<str>> = AssetCache::new();
        let key = PathBuf::from("assets/tree.json");

        assert!(cache.fetch(&key).is_none());
        cache.store(key.clone(), Arc::from("tree"));
        assert_eq!(cache.fetch(&key).as_deref(), Some("tree"));
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 1);
    }
}
