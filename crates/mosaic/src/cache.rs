//! Window and field-value caches.
//!
//! Resolved windows are cached in an LRU keyed by the selector's
//! structural hash, so repeating a query (or re-expressing the same
//! shape) reuses the resolved geometry. Field values are cached
//! per-window behind an opt-in flag; value entries never expire on
//! their own and must be dropped explicitly with [`ValueCache::clear`].

use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use crate::fields::FieldBuffer;
use crate::view::WindowGrid;

/// Counters for cache behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of resolved windows, keyed by selector hash.
pub struct WindowCache {
    cache: LruCache<u64, Rc<WindowGrid>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl WindowCache {
    /// Creates a cache holding at most `capacity` windows.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up a resolved window, updating LRU order and counters.
    pub fn get(&mut self, key: u64) -> Option<Rc<WindowGrid>> {
        if let Some(window) = self.cache.get(&key) {
            self.hits += 1;
            Some(Rc::clone(window))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Inserts a resolved window, evicting the least recently used
    /// entry when at capacity.
    pub fn insert(&mut self, key: u64, window: Rc<WindowGrid>) {
        if self.cache.len() == self.cache.cap().get() && !self.cache.contains(&key) {
            self.evictions += 1;
        }
        self.cache.put(key, window);
    }

    pub fn contains(&self, key: u64) -> bool {
        self.cache.contains(&key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
            evictions: self.evictions,
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Opt-in cache of computed field values, keyed by (window hash, field).
///
/// Disabled by default: every insert is a no-op until the cache is
/// constructed enabled. There is no eviction; entries persist until
/// [`ValueCache::clear`].
pub struct ValueCache {
    enabled: bool,
    values: HashMap<(u64, String), FieldBuffer>,
    hits: u64,
    misses: u64,
}

impl ValueCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            values: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&mut self, window_key: u64, field: &str) -> Option<FieldBuffer> {
        if !self.enabled {
            return None;
        }
        if let Some(buffer) = self.values.get(&(window_key, field.to_string())) {
            self.hits += 1;
            Some(buffer.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, window_key: u64, field: &str, buffer: FieldBuffer) {
        if !self.enabled {
            return;
        }
        self.values.insert((window_key, field.to_string()), buffer);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.values.len(),
            evictions: 0,
        }
    }

    /// Drops every cached value. The only way entries leave the cache.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
