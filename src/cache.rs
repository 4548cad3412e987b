//! Bounded in-memory cache for rendered documentation pages.
//!
//! Entries are evicted least recently used first once either the entry
//! count or the summed byte size would exceed its limit, and expire after
//! a period without access.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

pub const DEFAULT_CACHE_SIZE_MB: u64 = 50;
pub const DEFAULT_CACHE_ENTRIES: usize = 100;
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;

/// Limits of a [`ContentCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Upper bound on the summed byte length of all stored values.
    pub max_bytes: usize,
    pub max_entries: usize,
    /// Lifetime of an entry, counted from its last read or write.
    pub ttl: Duration,
}

impl CacheOptions {
    pub fn new(max_size_mb: u64, max_entries: usize, ttl_minutes: u64) -> Self {
        Self {
            max_bytes: usize::try_from(max_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX),
            max_entries,
            ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
        }
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE_MB, DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_TTL_MINUTES)
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    size: usize,
    last_access: Instant,
    expires_at: Instant,
    /// Recency stamp; the smallest stamp is the least recently used entry.
    stamp: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// LRU cache of rendered page payloads bounded by entry count, total bytes
/// and a per-entry TTL.
///
/// `get` refreshes an entry's recency and expiry; `has` only looks.
#[derive(Debug)]
pub struct ContentCache {
    options: CacheOptions,
    entries: HashMap<String, CacheEntry>,
    recency: BTreeMap<u64, String>,
    total_bytes: usize,
    next_stamp: u64,
}

impl ContentCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            total_bytes: 0,
            next_stamp: 0,
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Returns the cached value for `key` and marks it as recently used.
    ///
    /// # Returns
    /// `None` if the key is absent or its entry has expired
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        if self.entries.get(key)?.is_expired(now) {
            self.remove(key);
            return None;
        }

        let stamp = self.bump();
        let ttl = self.options.ttl;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.stamp);
        self.recency.insert(stamp, key.to_string());
        entry.stamp = stamp;
        entry.last_access = now;
        entry.expires_at = now + ttl;
        Some(entry.value.clone())
    }

    /// Stores `value` under `key`, evicting least recently used entries
    /// until both the count and byte limits hold. A value larger than the
    /// byte limit on its own is not stored.
    ///
    /// # Arguments
    /// * `key` - Cache key, e.g. `doc:ci/yaml/_index.md`
    /// * `value` - Serialized payload; its byte length counts against the size limit
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let now = Instant::now();

        self.remove(&key);

        let size = value.len();
        if size > self.options.max_bytes || self.options.max_entries == 0 {
            tracing::debug!("Not caching {} ({} bytes exceeds cache limits)", key, size);
            return;
        }

        self.purge_expired(now);
        while self.entries.len() >= self.options.max_entries
            || self.total_bytes + size > self.options.max_bytes
        {
            if !self.evict_oldest() {
                break;
            }
        }

        let stamp = self.bump();
        self.recency.insert(stamp, key.clone());
        self.total_bytes += size;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                size,
                last_access: now,
                expires_at: now + self.options.ttl,
                stamp,
            },
        );
    }

    /// Whether an unexpired entry exists. Does not affect recency.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.total_bytes = 0;
    }

    /// Number of unexpired entries.
    pub fn size(&self) -> usize {
        let now = Instant::now();
        self.entries.values().filter(|entry| !entry.is_expired(now)).count()
    }

    /// Summed byte length of all stored values.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Time since `key` was last read or written.
    pub fn idle_time(&self, key: &str) -> Option<Duration> {
        self.entries.get(key).map(|entry| entry.last_access.elapsed())
    }

    fn bump(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.stamp);
        self.total_bytes -= entry.size;
        Some(entry)
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.total_bytes -= entry.size;
            tracing::debug!("Evicted {} from content cache ({} bytes)", key, entry.size);
        }
        true
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn cache_with(max_entries: usize) -> ContentCache {
        ContentCache::new(CacheOptions::new(1, max_entries, 5))
    }

    #[test]
    fn test_set_get_has() {
        let mut cache = cache_with(10);

        assert!(!cache.has("key1"));
        assert_eq!(cache.get("nonexistent"), None);

        cache.set("key1", "value1");
        assert!(cache.has("key1"));
        assert!(!cache.has("key2"));
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut cache = cache_with(10);
        cache.set("key1", "value1");
        cache.set("key2", "value2");
        assert_eq!(cache.size(), 2);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.total_bytes(), 0);
        assert!(!cache.has("key1"));
        assert!(!cache.has("key2"));
    }

    #[test]
    fn test_max_entries_evicts_least_recently_used() {
        let mut cache = cache_with(2);
        cache.set("k1", "v1");
        cache.set("k2", "v2");
        cache.set("k3", "v3");

        assert!(!cache.has("k1"));
        assert!(cache.has("k2"));
        assert!(cache.has("k3"));
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = cache_with(2);
        cache.set("k1", "v1");
        cache.set("k2", "v2");
        assert!(cache.get("k1").is_some());
        cache.set("k3", "v3");

        assert!(cache.has("k1"));
        assert!(!cache.has("k2"));
        assert!(cache.has("k3"));
    }

    #[test]
    fn test_has_does_not_refresh_recency() {
        let mut cache = cache_with(2);
        cache.set("k1", "v1");
        cache.set("k2", "v2");
        assert!(cache.has("k1"));
        cache.set("k3", "v3");

        assert!(!cache.has("k1"));
        assert!(cache.has("k2"));
    }

    #[test]
    fn test_overwrite_replaces_size() {
        let mut cache = cache_with(2);
        cache.set("k1", "short");
        cache.set("k1", "a much longer value");

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.total_bytes(), "a much longer value".len());
        assert_eq!(cache.get("k1"), Some("a much longer value".to_string()));
    }

    #[test]
    fn test_byte_limit_evicts() {
        let mut cache = ContentCache::new(CacheOptions {
            max_bytes: 10,
            max_entries: 100,
            ttl: Duration::from_secs(60),
        });
        cache.set("a", "aaaa");
        cache.set("b", "bbbb");
        cache.set("c", "cccc");

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.total_bytes(), 8);
    }

    #[test]
    fn test_oversized_value_is_not_stored() {
        let mut cache = ContentCache::new(CacheOptions {
            max_bytes: 4,
            max_entries: 100,
            ttl: Duration::from_secs(60),
        });
        cache.set("small", "ok");
        cache.set("big", "too large");

        assert!(cache.has("small"));
        assert!(!cache.has("big"));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = ContentCache::new(CacheOptions {
            max_bytes: 1024,
            max_entries: 10,
            ttl: Duration::from_millis(30),
        });
        cache.set("k1", "v1");
        assert!(cache.has("k1"));

        sleep(Duration::from_millis(60));
        assert!(!cache.has("k1"));
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_get_extends_ttl() {
        let mut cache = ContentCache::new(CacheOptions {
            max_bytes: 1024,
            max_entries: 10,
            ttl: Duration::from_millis(200),
        });
        cache.set("k1", "v1");

        sleep(Duration::from_millis(120));
        assert!(cache.get("k1").is_some());
        sleep(Duration::from_millis(120));
        assert!(cache.has("k1"));
        assert!(cache.idle_time("k1").is_some());
    }
}
