//! # TTL Cache
//! Keyed stores with a fixed freshness window per entry.
//!
//! - `TtlCache`: process-scoped, in-memory. Created at startup, never persisted,
//!   gone on restart. Used for translations and price lookups.
//! - `ArticleCache`: persisted through the versioned key-value store, keyed by
//!   article slug.
//!
//! Expiry is absolute (write time + ttl); reads never renew it. A stale entry
//! is removed on the read that notices it, or by `sweep()`.

pub mod articles;
pub mod clock;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;

pub use articles::{ArticleCache, CachedArticle};
pub use clock::{Clock, ManualClock, SystemClock};

/// Upper bound for configured in-memory TTLs (one week).
pub const MAX_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Configured seconds → TTL, clamped to `0..=MAX_TTL_SECS`.
pub fn ttl_from_secs(secs: i64) -> ChronoDuration {
    ChronoDuration::try_seconds(secs.clamp(0, MAX_TTL_SECS)).unwrap_or_else(ChronoDuration::zero)
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: ChronoDuration,
}

impl<V> Entry<V> {
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.stored_at) > self.ttl
    }
}

/// In-memory cache with per-entry TTL.
///
/// The get path (check, evict, return) runs under one lock, so concurrent
/// handlers never observe a half-evicted entry.
pub struct TtlCache<K, V> {
    name: &'static str,
    inner: Mutex<HashMap<K, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            inner: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Store `value`, replacing any previous entry for `key` wholesale.
    /// Expired entries are evicted on the same pass, so keys that are never
    /// read again do not accumulate.
    pub fn put(&self, key: K, value: V, ttl: ChronoDuration) {
        let now = self.clock.now();
        let mut map = self.inner.lock().expect("ttl cache mutex poisoned");
        map.retain(|_, e| !e.is_stale(now));
        map.insert(
            key,
            Entry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut map = self.inner.lock().expect("ttl cache mutex poisoned");

        let stale = match map.get(key) {
            None => {
                counter!("cache_misses_total", "cache" => self.name).increment(1);
                return None;
            }
            Some(e) => e.is_stale(now),
        };

        if stale {
            map.remove(key);
            counter!("cache_misses_total", "cache" => self.name).increment(1);
            return None;
        }

        counter!("cache_hits_total", "cache" => self.name).increment(1);
        map.get(key).map(|e| e.value.clone())
    }

    /// Evict every stale entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.inner.lock().expect("ttl cache mutex poisoned");
        let before = map.len();
        map.retain(|_, e| !e.is_stale(now));
        before - map.len()
    }

    /// Number of stored entries, stale ones included until swept.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("ttl cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().expect("ttl cache mutex poisoned").clear();
    }
}
