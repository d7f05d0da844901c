#![forbid(unsafe_code)]

//! Bounded memo of derived views keyed by filter fingerprint.
//!
//! Purely an optimization: a miss recomputes, a hit hands back a shared view
//! that is structurally equal to what a recompute would produce.
//!
//! # Hash Collisions
//! Lookups go by the 64-bit [`FilterState::fingerprint`], but each entry also
//! stores the full filter. A fingerprint match with a different filter is a
//! miss, never a wrong view.

use std::num::NonZeroUsize;
use std::sync::Arc;

use aerolens_core::{DerivedView, FilterState};
use lru::LruCache;

/// Default number of cached views.
pub const DEFAULT_CAPACITY: usize = 16;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Entry {
    filter: FilterState,
    view: Arc<DerivedView>,
}

/// LRU cache of views.
#[derive(Debug)]
pub struct ViewCache {
    /// `None` when caching is disabled.
    cache: Option<LruCache<u64, Entry>>,
    stats: CacheStats,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ViewCache {
    /// A cache holding at most `capacity` views. Zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.cap().get())
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Look up the view for `filter`, refreshing its recency on a hit.
    pub fn get(&mut self, filter: &FilterState) -> Option<Arc<DerivedView>> {
        let hit = self
            .cache
            .as_mut()
            .and_then(|c| c.get(&filter.fingerprint()))
            .filter(|entry| entry.filter == *filter)
            .map(|entry| Arc::clone(&entry.view));
        if hit.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        hit
    }

    /// Remember `view` as the result for `filter`.
    pub fn insert(&mut self, filter: FilterState, view: Arc<DerivedView>) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let fingerprint = filter.fingerprint();
        if let Some((evicted, _)) = cache.push(fingerprint, Entry { filter, view })
            && evicted != fingerprint
        {
            self.stats.evictions += 1;
        }
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerolens_core::Severity;

    fn view(qualifying: usize) -> Arc<DerivedView> {
        Arc::new(DerivedView {
            qualifying,
            ..DerivedView::default()
        })
    }

    #[test]
    fn hit_returns_shared_view() {
        let mut cache = ViewCache::new(4);
        let f = FilterState::default();
        assert!(cache.get(&f).is_none());
        cache.insert(f, view(7));
        let hit = cache.get(&f).unwrap();
        assert_eq!(hit.qualifying, 7);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = ViewCache::new(2);
        let a = FilterState::default();
        let b = a.with_year_range(2000, 2001);
        let c = a.with_year_range(2002, 2003);
        cache.insert(a, view(1));
        cache.insert(b, view(2));
        assert!(cache.get(&a).is_some()); // a is now most recent
        cache.insert(c, view(3));
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn reinsert_replaces() {
        let mut cache = ViewCache::new(4);
        let f = FilterState::default()
            .with_severities(Severity::Fatal.flag())
            .unwrap();
        cache.insert(f, view(1));
        cache.insert(f, view(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&f).unwrap().qualifying, 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn zero_capacity_disables() {
        let mut cache = ViewCache::new(0);
        let f = FilterState::default();
        cache.insert(f, view(1));
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
        assert!(cache.get(&f).is_none());
    }

    #[test]
    fn clear_empties() {
        let mut cache = ViewCache::new(2);
        cache.insert(FilterState::default(), view(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }
}
