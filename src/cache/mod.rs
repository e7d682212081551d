use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// In-memory cache of object-store prefix listings
///
/// Keys are listing prefixes, values the full set of object keys found below
/// them. A listing can be stale the moment it is stored; callers that need
/// fresh results invalidate the prefix before listing.
pub struct ListingCache {
    /// LRU cache mapping listing prefixes to object keys
    cache: Arc<RwLock<LruCache<String, Arc<Vec<String>>>>>,
}

impl ListingCache {
    /// Create a new listing cache with a maximum number of prefixes
    pub fn new(capacity: usize) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY));
        ListingCache {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Get a cached listing
    pub fn get(&self, prefix: &str) -> Option<Arc<Vec<String>>> {
        let mut cache = self.cache.write().ok()?;
        cache.get(prefix).cloned()
    }

    /// Store a listing
    pub fn put(&self, prefix: String, keys: Arc<Vec<String>>) {
        if let Ok(mut cache) = self.cache.write() {
            cache.put(prefix, keys);
        }
    }

    /// Drop the listing of one prefix
    pub fn invalidate(&self, prefix: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.pop(prefix);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().ok().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY.get())
    }
}

impl Clone for ListingCache {
    fn clone(&self) -> Self {
        ListingCache {
            cache: Arc::clone(&self.cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_invalidate() {
        let cache = ListingCache::new(2);
        cache.put("a".to_string(), Arc::new(vec!["a/1".to_string()]));
        assert_eq!(cache.get("a").unwrap().as_slice(), ["a/1"]);

        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_and_shared_clone() {
        let cache = ListingCache::new(1);
        let shared = cache.clone();
        cache.put("a".to_string(), Arc::new(Vec::new()));
        shared.put("b".to_string(), Arc::new(Vec::new()));

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_falls_back() {
        let cache = ListingCache::new(0);
        cache.put("a".to_string(), Arc::new(Vec::new()));
        assert_eq!(cache.len(), 1);
    }
}
