//! Bounded in-memory store with per-entry TTL.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries kept after any insertion.
    pub max_entries: usize,
    /// TTL applied by [`TtlCache::set`], in milliseconds.
    pub default_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl_ms: 5 * 60 * 1000,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = ttl.as_millis() as u64;
        self
    }
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    data: V,
    stored_at: Instant,
    ttl: Duration,
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired_at(&self, now: Instant) -> bool {
        self.ttl.is_zero() || now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

/// Key/value store with lazy expiry and insertion-time eviction.
///
/// Expired entries are only dropped when touched by a read or swept at the
/// start of a write; there is no background timer. When the store is over
/// capacity after an insertion, the entries with the oldest insertion time are
/// evicted. Reads do not refresh an entry's position.
pub struct TtlCache<V> {
    entries: Mutex<Entries<V>>,
    max_entries: usize,
    default_ttl: Duration,
    stats: AtomicStats,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_seq: 0,
            }),
            max_entries,
            default_ttl,
            stats: AtomicStats::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.default_ttl())
    }

    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key.into(), value, self.default_ttl, Instant::now());
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key.into(), value, ttl, Instant::now());
    }

    pub(crate) fn set_at(&self, key: String, value: V, ttl: Duration, now: Instant) {
        let mut entries = self.lock();
        entries.map.retain(|_, e| !e.is_expired_at(now));

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            key,
            CacheEntry {
                data: value,
                stored_at: now,
                ttl,
                seq,
            },
        );
        self.stats.sets.fetch_add(1, Ordering::Relaxed);

        let evicted = Self::evict_oldest(&mut entries.map, self.max_entries);
        if evicted > 0 {
            self.stats.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    fn evict_oldest(map: &mut HashMap<String, CacheEntry<V>>, max_entries: usize) -> u64 {
        if map.len() <= max_entries {
            return 0;
        }
        let mut by_age: Vec<(Instant, u64, String)> = map
            .iter()
            .map(|(k, e)| (e.stored_at, e.seq, k.clone()))
            .collect();
        by_age.sort_unstable();

        let excess = map.len() - max_entries;
        for (_, _, key) in by_age.into_iter().take(excess) {
            map.remove(&key);
        }
        excess as u64
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let found = match entries.map.get(key).map(|e| e.is_expired_at(now)) {
            Some(true) => {
                entries.map.remove(key);
                None
            }
            Some(false) => entries.map.get(key).map(|e| e.data.clone()),
            None => None,
        };
        let counter = if found.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn has(&self, key: &str) -> bool {
        self.has_at(key, Instant::now())
    }

    pub(crate) fn has_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.lock();
        match entries.map.get(key).map(|e| e.is_expired_at(now)) {
            Some(true) => {
                entries.map.remove(key);
                false
            }
            Some(false) => true,
            None => false,
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().map.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().map.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_get_returns_value_before_expiry() {
        let cache = TtlCache::new(10, ms(100));
        let t0 = Instant::now();
        cache.set_at("k".into(), "v".to_string(), ms(100), t0);
        assert_eq!(cache.get_at("k", t0 + ms(100)), Some("v".to_string()));
    }

    #[test]
    fn test_get_after_ttl_is_absent_and_removes_entry() {
        let cache = TtlCache::new(10, ms(100));
        let t0 = Instant::now();
        cache.set_at("k".into(), "v".to_string(), ms(100), t0);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get_at("k", t0 + ms(150)), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_in_real_time() {
        let cache = TtlCache::new(10, Duration::from_secs(60));
        cache.set_with_ttl("k", 1u32, ms(40));
        assert!(cache.has("k"));
        tokio::time::sleep(ms(120)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_ttl_is_expired_on_next_read() {
        let cache = TtlCache::new(10, ms(100));
        let t0 = Instant::now();
        cache.set_at("k".into(), 1u8, Duration::ZERO, t0);
        assert!(!cache.has_at("k", t0));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_same_instant_inserts_evict_in_insertion_order() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        let ttl = Duration::from_secs(60);
        cache.set_at("a".into(), 1, ttl, now);
        cache.set_at("b".into(), 2, ttl, now);
        cache.set_at("c".into(), 3, ttl, now);

        assert!(!cache.has_at("a", now));
        assert!(cache.has_at("b", now));
        assert!(cache.has_at("c", now));
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.set("hot", 1);
        cache.set("cold", 2);
        for _ in 0..5 {
            assert_eq!(cache.get("hot"), Some(1));
        }
        cache.set("new", 3);
        assert_eq!(cache.get("hot"), None);
        assert_eq!(cache.get("cold"), Some(2));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = TtlCache::new(0, Duration::from_secs(60));
        cache.set("a", 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_set_sweeps_expired_entries() {
        let cache = TtlCache::new(10, ms(100));
        let t0 = Instant::now();
        cache.set_at("old".into(), 1, ms(10), t0);
        cache.set_at("fresh".into(), 2, ms(100), t0);
        // Expired entries linger until the next write.
        assert_eq!(cache.len(), 2);

        cache.set_at("another".into(), 3, ms(100), t0 + ms(50));
        assert_eq!(cache.len(), 2);
        assert!(!cache.has_at("old", t0 + ms(50)));
    }

    #[test]
    fn test_overwrite_refreshes_insertion_time() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        let ttl = Duration::from_secs(60);
        cache.set_at("a".into(), 1, ttl, t0);
        cache.set_at("b".into(), 2, ttl, t0 + ms(1));
        cache.set_at("a".into(), 10, ttl, t0 + ms(2));
        cache.set_at("c".into(), 3, ttl, t0 + ms(3));

        let now = t0 + ms(4);
        assert_eq!(cache.get_at("a", now), Some(10));
        assert!(!cache.has_at("b", now));
        assert!(cache.has_at("c", now));
    }

    #[test]
    fn test_delete_clear_and_stats() {
        let cache: TtlCache<String> = TtlCache::default();
        cache.set("a", "1".into());
        cache.set("b", "2".into());
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some("2".into()));

        let stats = cache.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        let cache: TtlCache<u8> = TtlCache::from_config(&config.with_max_entries(5));
        assert_eq!(cache.max_entries(), 5);
    }
}
