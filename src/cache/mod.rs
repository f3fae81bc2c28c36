//! Context cache with TTL freshness and LRU capacity bound
//!
//! Memoizes externally sourced context (weather, market quotes, historical
//! aggregates) keyed by `(domain, entity_key)`. Every entry carries a
//! wall-clock `expires_at`; a lookup at or past expiry is a miss and drops
//! the entry. When the entry count reaches `max_entries` the least recently
//! used entry is evicted first.

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::types::{ContextBundle, Domain};

/// Cache key: the advisory domain plus a caller-chosen entity key
/// (city name, `user:field` id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub domain: Domain,
    pub entity_key: String,
}

impl CacheKey {
    pub fn new(domain: Domain, entity_key: impl Into<String>) -> Self {
        Self {
            domain,
            entity_key: entity_key.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.domain, self.entity_key)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bundle: ContextBundle,
    expires_at: DateTime<Utc>,
}

/// Cache counters snapshot
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

/// Concurrency-safe TTL + LRU cache of context bundles.
///
/// All operations take one short critical section on the inner map, so a
/// `put` for a key is visible to every `get` issued after it returns.
pub struct ContextCache {
    inner: Mutex<LruCache<CacheKey, CacheEntry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl ContextCache {
    /// Create a cache bounded to `max_entries` (clamped to at least 1)
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity: capacity.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::warn!("Context cache mutex poisoned, recovering");
            e.into_inner()
        })
    }

    /// Fresh bundle for `key`, or `None` on miss or expiry
    pub fn get(&self, key: &CacheKey) -> Option<ContextBundle> {
        self.get_at(key, Utc::now())
    }

    /// Lookup evaluated at an explicit wall-clock instant
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<ContextBundle> {
        let mut cache = self.lock();

        let fresh = match cache.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.bundle.clone()),
            Some(_) => {
                cache.pop(key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Context cache entry expired");
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        fresh
    }

    /// Insert or replace the entry for `key`, valid for `ttl` from now
    pub fn put(&self, key: CacheKey, bundle: ContextBundle, ttl: Duration) {
        self.put_at(key, bundle, ttl, Utc::now());
    }

    pub fn put_at(&self, key: CacheKey, bundle: ContextBundle, ttl: Duration, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut cache = self.lock();
        if let Some((evicted, _)) = cache.push(key.clone(), CacheEntry { bundle, expires_at }) {
            if evicted != key {
                debug!(evicted = %evicted, "Context cache full, evicted least recently used entry");
            }
        }
    }

    /// Drop every entry already past expiry; returns how many were removed
    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut cache = self.lock();
        let stale: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        self.expired.fetch_add(stale.len() as u64, Ordering::Relaxed);
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
