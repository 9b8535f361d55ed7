//! Feature map cache
//!
//! The true joint feature map ψ(x_i, y_i) of an example never changes during
//! training but is needed in every sweep. This LRU cache keeps the most
//! recently used maps so oracles with expensive feature extraction are
//! queried once per example while memory stays bounded.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache of true feature maps keyed by example index
pub struct FeatureMapCache {
    cache: LruCache<usize, Arc<Vec<f64>>>,
    hits: u64,
    misses: u64,
}

impl FeatureMapCache {
    /// Create a new cache holding at most `capacity` feature maps
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Get a feature map from cache
    pub fn get(&mut self, example: usize) -> Option<Arc<Vec<f64>>> {
        if let Some(map) = self.cache.get(&example) {
            self.hits += 1;
            Some(Arc::clone(map))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Put a feature map into cache
    pub fn put(&mut self, example: usize, map: Vec<f64>) -> Arc<Vec<f64>> {
        let map = Arc::new(map);
        self.cache.put(example, Arc::clone(&map));
        map
    }

    /// Return the cached map or compute, store and return it
    ///
    /// Errors from `compute` are propagated and nothing is cached.
    pub fn get_or_try_insert<E, F>(&mut self, example: usize, compute: F) -> Result<Arc<Vec<f64>>, E>
    where
        F: FnOnce() -> Result<Vec<f64>, E>,
    {
        if let Some(map) = self.get(example) {
            return Ok(map);
        }
        let map = compute()?;
        Ok(self.put(example, map))
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_cache_basic() {
        let mut cache = FeatureMapCache::new(3);

        assert!(cache.get(0).is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.put(0, vec![1.0, 2.0]);
        assert_eq!(cache.get(0).as_deref(), Some(&vec![1.0, 2.0]));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_feature_cache_lru_eviction() {
        let mut cache = FeatureMapCache::new(2);

        cache.put(0, vec![0.0]);
        cache.put(1, vec![1.0]);
        cache.put(2, vec![2.0]); // Should evict 0

        assert!(cache.get(0).is_none());
        assert_eq!(cache.get(1).as_deref(), Some(&vec![1.0]));
        assert_eq!(cache.get(2).as_deref(), Some(&vec![2.0]));
    }

    #[test]
    fn test_get_or_try_insert() {
        let mut cache = FeatureMapCache::new(4);
        let mut calls = 0;

        for _ in 0..3 {
            let map: Result<_, String> = cache.get_or_try_insert(7, || {
                calls += 1;
                Ok(vec![3.0])
            });
            assert_eq!(*map.expect("Should compute"), vec![3.0]);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.hit_rate(), 2.0 / 3.0);

        let failed: Result<_, String> = cache.get_or_try_insert(8, || Err("bad".to_string()));
        assert!(failed.is_err());
        assert!(cache.get(8).is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = FeatureMapCache::new(0);
        assert_eq!(cache.stats().capacity, 1);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = FeatureMapCache::new(10);
        cache.put(0, vec![1.0]);
        cache.get(0);

        cache.clear();

        assert!(cache.get(0).is_none());
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 1);
    }
}
