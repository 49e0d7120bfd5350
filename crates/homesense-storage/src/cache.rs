//! Read-path caches.
//!
//! List queries are cached by query signature with a TTL, and single
//! patterns by id in a small LRU. The mining pipeline invalidates
//! everything after committing a batch, so interactive reads serve the
//! previous batch at worst for one TTL.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use moka::sync::Cache;
use parking_lot::Mutex;
use tracing::debug;

use homesense_core::{CacheConfig, Pattern, Synergy};

use crate::repository::{PatternQuery, SynergyQuery};
use crate::{Error, Result};

/// TTL + LRU cache over repository reads.
pub struct QueryCache {
    pattern_lists: Cache<String, Arc<Vec<Pattern>>>,
    synergy_lists: Cache<String, Arc<Vec<Synergy>>>,
    patterns_by_id: Mutex<LruCache<String, Pattern>>,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let lru_capacity =
            NonZeroUsize::new(config.capacity.max(1) as usize).unwrap_or(NonZeroUsize::MIN);
        Self {
            pattern_lists: build_list_cache(config),
            synergy_lists: build_list_cache(config),
            patterns_by_id: Mutex::new(LruCache::new(lru_capacity)),
        }
    }

    /// Cached pattern list for one query, loading on miss.
    pub fn patterns(
        &self,
        query: &PatternQuery,
        load: impl FnOnce() -> Result<Vec<Pattern>>,
    ) -> Result<Arc<Vec<Pattern>>> {
        self.pattern_lists
            .try_get_with(query.cache_key(), || load().map(Arc::new))
            .map_err(flatten_load_error)
    }

    /// Cached synergy list for one query, loading on miss.
    pub fn synergies(
        &self,
        query: &SynergyQuery,
        load: impl FnOnce() -> Result<Vec<Synergy>>,
    ) -> Result<Arc<Vec<Synergy>>> {
        self.synergy_lists
            .try_get_with(query.cache_key(), || load().map(Arc::new))
            .map_err(flatten_load_error)
    }

    /// Cached single-pattern lookup, loading on miss.
    pub fn pattern_by_id(
        &self,
        pattern_id: &str,
        load: impl FnOnce() -> Result<Option<Pattern>>,
    ) -> Result<Option<Pattern>> {
        if let Some(hit) = self.patterns_by_id.lock().get(pattern_id).cloned() {
            return Ok(Some(hit));
        }
        let loaded = load()?;
        if let Some(pattern) = &loaded {
            self.patterns_by_id
                .lock()
                .put(pattern_id.to_string(), pattern.clone());
        }
        Ok(loaded)
    }

    /// Drop every cached entry. Called after each batch commit.
    pub fn invalidate_all(&self) {
        self.pattern_lists.invalidate_all();
        self.synergy_lists.invalidate_all();
        self.patterns_by_id.lock().clear();
        debug!("query caches invalidated");
    }
}

/// One TTL'd list cache; the pattern and synergy lists differ only in
/// their value type.
fn build_list_cache<V: Clone + Send + Sync + 'static>(config: &CacheConfig) -> Cache<String, V> {
    Cache::builder()
        .max_capacity(config.capacity)
        .time_to_live(Duration::from_secs(config.ttl_secs))
        .build()
}

/// moka wraps the loader error in an `Arc`; surface the message.
fn flatten_load_error(e: Arc<Error>) -> Error {
    Error::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::{PatternKind, PatternMeta, TimeWindowStats};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_pattern() -> Pattern {
        let occurrences: Vec<_> = (1..=4)
            .map(|d| Utc.with_ymd_and_hms(2026, 2, d, 19, 0, 0).unwrap())
            .collect();
        Pattern::new(
            PatternKind::TimeOfDay,
            vec!["light_desk".into()],
            0.8,
            4,
            TimeWindowStats::from_occurrences(&occurrences).unwrap(),
            PatternMeta::TimeOfDay {
                state: "on".into(),
                hour: 19,
                band_fraction: 0.8,
                extra: serde_json::Value::Null,
            },
        )
    }

    #[test]
    fn test_second_read_hits_the_cache() {
        let cache = QueryCache::new(&CacheConfig::default());
        let loads = AtomicUsize::new(0);
        let query = PatternQuery::new();

        for _ in 0..3 {
            let list = cache
                .patterns(&query, || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![sample_pattern()])
                })
                .unwrap();
            assert_eq!(list.len(), 1);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_queries_cached_separately() {
        let cache = QueryCache::new(&CacheConfig::default());
        let loads = AtomicUsize::new(0);

        let mut load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![sample_pattern()])
        };
        cache.patterns(&PatternQuery::new(), &mut load).unwrap();
        cache
            .patterns(&PatternQuery::new().with_min_confidence(0.5), &mut load)
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_all_forces_reload() {
        let cache = QueryCache::new(&CacheConfig::default());
        let loads = AtomicUsize::new(0);
        let query = PatternQuery::new();
        let mut load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![sample_pattern()])
        };

        cache.patterns(&query, &mut load).unwrap();
        cache.invalidate_all();
        cache.patterns(&query, &mut load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ttl_expiry_forces_reload() {
        let config = CacheConfig {
            ttl_secs: 1,
            ..CacheConfig::default()
        };
        let cache = QueryCache::new(&config);
        let loads = AtomicUsize::new(0);
        let query = PatternQuery::new();
        let mut load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![sample_pattern()])
        };

        cache.patterns(&query, &mut load).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        cache.patterns(&query, &mut load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2, "expired entry reloads");
    }

    #[test]
    fn test_pattern_by_id_caches_hits_only() {
        let cache = QueryCache::new(&CacheConfig::default());
        let loads = AtomicUsize::new(0);
        let pattern = sample_pattern();
        let id = pattern.pattern_id.clone();

        // Misses are not cached.
        for _ in 0..2 {
            let miss = cache
                .pattern_by_id("absent", || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .unwrap();
            assert!(miss.is_none());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        // Hits are.
        loads.store(0, Ordering::SeqCst);
        for _ in 0..2 {
            let hit = cache
                .pattern_by_id(&id, || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(pattern.clone()))
                })
                .unwrap();
            assert!(hit.is_some());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_error_propagates() {
        let cache = QueryCache::new(&CacheConfig::default());
        let result = cache.patterns(&PatternQuery::new(), || {
            Err(Error::Storage("backend down".into()))
        });
        assert!(result.is_err());
    }
}
