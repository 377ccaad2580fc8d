//! LRU block cache for remote file reads.

use lru::LruCache;
use std::num::NonZeroUsize;

/// LRU cache of fixed-size file blocks keyed by block index.
pub struct BlockCache {
    inner: LruCache<u64, Vec<u8>>,
}

impl BlockCache {
    /// Create a new cache holding at most `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
        }
    }

    pub fn get(&mut self, block: u64) -> Option<&Vec<u8>> {
        self.inner.get(&block)
    }

    pub fn contains(&self, block: u64) -> bool {
        self.inner.contains(&block)
    }

    pub fn insert(&mut self, block: u64, data: Vec<u8>) {
        self.inner.put(block, data);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_insert_get() {
        let mut cache = BlockCache::new(2);
        cache.insert(5, vec![1, 2, 3]);
        assert_eq!(cache.get(5), Some(&vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_eviction() {
        let mut cache = BlockCache::new(2);
        cache.insert(0, vec![1]);
        cache.insert(1, vec![2]);
        cache.insert(2, vec![3]); // evicts block 0

        assert!(!cache.contains(0));
        assert!(cache.contains(1));
        assert!(cache.contains(2));
    }
}
