//! Memoization of predicated `select` results.
//!
//! Entries are keyed by the canonical form of the predicate only. The key does not
//! include the table nor the contents of the record set, and nothing invalidates an
//! entry when a table changes: a hit may return rows computed for an older version
//! of a table, or for another table queried with the same predicate. Callers that
//! need fresh rows must [QueryCache::clear] the cache or disable it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::predicate::CanonicalKey;
use crate::table::Record;

/// Hit and miss counters of a [QueryCache].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<CanonicalKey, Arc<Vec<Record>>>,
    stats: CacheStats,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows stored under `key`, or runs `compute` and stores its result.
    /// A hit returns the very same allocation as the first call.
    pub fn memoize<F>(&mut self, key: CanonicalKey, compute: F) -> Arc<Vec<Record>>
    where
        F: FnOnce() -> Vec<Record>,
    {
        if let Some(rows) = self.entries.get(&key) {
            self.stats.hits += 1;
            debug!(?key, rows = rows.len(), "query cache hit");
            return Arc::clone(rows);
        }

        self.stats.misses += 1;
        let rows = Arc::new(compute());
        debug!(?key, rows = rows.len(), "query cache miss");
        self.entries.insert(key, Arc::clone(&rows));
        rows
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn key(col: &str, v: i64) -> CanonicalKey {
        vec![(col.to_string(), Value::Int(v))]
    }

    #[test]
    fn test_miss_then_hit_returns_same_allocation() {
        let mut cache = QueryCache::new();
        let first = cache.memoize(key("a", 1), || vec![Record::new()]);
        let second = cache.memoize(key("a", 1), || panic!("must not recompute"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_distinct_keys() {
        let mut cache = QueryCache::new();
        cache.memoize(key("a", 1), Vec::new);
        cache.memoize(key("a", 2), Vec::new);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_clear() {
        let mut cache = QueryCache::new();
        cache.memoize(key("a", 1), Vec::new);
        cache.clear();
        assert!(cache.is_empty());

        let rows = cache.memoize(key("a", 1), || vec![Record::new()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(cache.stats().misses, 2);
    }
}
