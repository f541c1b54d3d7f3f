// src/cache/articles.rs
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use crate::news::NormalizedArticle;
use crate::store::{VersionedStore, NEWS_CACHE_KEY, NEWS_CACHE_SCHEMA};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedArticle {
    pub article: NormalizedArticle,
    pub captured_at: DateTime<Utc>,
    pub ttl_hours: i64,
}

impl CachedArticle {
    /// A negative or out-of-range `ttl_hours` (only possible from a damaged
    /// blob) counts as already expired.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match ChronoDuration::try_hours(self.ttl_hours) {
            Some(ttl) if self.ttl_hours >= 0 => now.signed_duration_since(self.captured_at) > ttl,
            _ => true,
        }
    }
}

type ArticleMap = BTreeMap<String, CachedArticle>;

/// Persisted slug → article cache.
///
/// The whole map lives in one versioned blob. Every operation is
/// load → modify → save under one lock. An unreadable blob is an empty cache.
pub struct ArticleCache {
    store: VersionedStore,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl ArticleCache {
    pub fn new(store: VersionedStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: VersionedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> ArticleMap {
        self.store
            .load(NEWS_CACHE_KEY, NEWS_CACHE_SCHEMA)
            .unwrap_or_default()
    }

    fn save(&self, map: &ArticleMap) {
        self.store.save(NEWS_CACHE_KEY, NEWS_CACHE_SCHEMA, map);
    }

    pub fn put(&self, slug: &str, article: NormalizedArticle, ttl_hours: i64) {
        let _g = self.lock.lock().expect("article cache mutex poisoned");
        let now = self.clock.now();
        let mut map = self.load();
        map.retain(|_, e| !e.is_stale(now));
        map.insert(
            slug.to_string(),
            CachedArticle {
                article,
                captured_at: now,
                ttl_hours,
            },
        );
        self.save(&map);
    }

    /// Store many articles with one load/save cycle. Empty slugs are skipped.
    /// Expired entries are dropped from the blob on the same pass.
    pub fn put_many<'a, I>(&self, articles: I, ttl_hours: i64)
    where
        I: IntoIterator<Item = &'a NormalizedArticle>,
    {
        let _g = self.lock.lock().expect("article cache mutex poisoned");
        let now = self.clock.now();
        let mut map = self.load();
        map.retain(|_, e| !e.is_stale(now));
        for a in articles {
            let slug = a.slug();
            if slug.is_empty() {
                continue;
            }
            map.insert(
                slug,
                CachedArticle {
                    article: a.clone(),
                    captured_at: now,
                    ttl_hours,
                },
            );
        }
        self.save(&map);
    }

    pub fn get(&self, slug: &str) -> Option<NormalizedArticle> {
        let _g = self.lock.lock().expect("article cache mutex poisoned");
        let mut map = self.load();
        let stale = match map.get(slug) {
            None => {
                counter!("cache_misses_total", "cache" => "articles").increment(1);
                return None;
            }
            Some(entry) => entry.is_stale(self.clock.now()),
        };

        if stale {
            map.remove(slug);
            self.save(&map);
            counter!("cache_misses_total", "cache" => "articles").increment(1);
            return None;
        }

        counter!("cache_hits_total", "cache" => "articles").increment(1);
        map.remove(slug).map(|e| e.article)
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let _g = self.lock.lock().expect("article cache mutex poisoned");
        let now = self.clock.now();
        let mut map = self.load();
        let before = map.len();
        map.retain(|_, e| !e.is_stale(now));
        let removed = before - map.len();
        if removed > 0 {
            self.save(&map);
        }
        removed
    }

    pub fn len(&self) -> usize {
        let _g = self.lock.lock().expect("article cache mutex poisoned");
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::news::types::ArticleSource;
    use crate::store::MemoryBackend;
    use chrono::TimeZone;

    fn article(title: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            source: ArticleSource {
                name: "Example".to_string(),
            },
            ..Default::default()
        }
    }

    fn setup() -> (ArticleCache, Arc<ManualClock>, Arc<MemoryBackend>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let mem = Arc::new(MemoryBackend::new());
        let cache = ArticleCache::with_clock(VersionedStore::new(mem.clone()), clock.clone());
        (cache, clock, mem)
    }

    #[test]
    fn fresh_hit_then_stale_miss_removes_entry() {
        let (cache, clock, _) = setup();
        cache.put("a", article("A"), 1);
        assert_eq!(cache.get("a"), Some(article("A")));

        clock.advance(ChronoDuration::minutes(61));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (cache, clock, _) = setup();
        cache.put("short", article("S"), 1);
        cache.put("long", article("L"), 24);
        clock.advance(ChronoDuration::hours(2));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
    }

    #[test]
    fn put_many_keys_by_slug() {
        let (cache, _, _) = setup();
        let items = vec![article("Fed Holds Rates"), article("!!!")];
        cache.put_many(&items, 6);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fed-holds-rates").is_some());
    }

    #[test]
    fn corrupt_blob_is_an_empty_cache_and_gets_replaced() {
        let (cache, _, mem) = setup();
        mem.insert_raw(NEWS_CACHE_KEY, "]]garbage[[");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.sweep(), 0);

        cache.put("a", article("A"), 1);
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn damaged_ttl_reads_as_expired_and_cache_keeps_working() {
        let (cache, _, mem) = setup();
        let blob = serde_json::json!({
            "schema_version": NEWS_CACHE_SCHEMA,
            "data": {
                "huge": { "article": article("H"), "captured_at": "2025-06-01T08:00:00Z", "ttl_hours": i64::MAX },
                "negative": { "article": article("N"), "captured_at": "2025-06-01T08:00:00Z", "ttl_hours": -3 }
            }
        });
        mem.insert_raw(NEWS_CACHE_KEY, &blob.to_string());

        assert_eq!(cache.sweep(), 2);
        assert_eq!(cache.get("huge"), None);
        cache.put_many(&[article("After")], 6);
        assert!(cache.get("after").is_some());
    }

    #[test]
    fn writes_drop_expired_entries_nobody_reads() {
        let (cache, clock, _) = setup();
        cache.put("old-1", article("O1"), 1);
        cache.put_many(&[article("Old 2")], 1);
        clock.advance(ChronoDuration::hours(2));

        cache.put("fresh", article("F"), 1);
        assert_eq!(cache.len(), 1);

        clock.advance(ChronoDuration::hours(2));
        cache.put_many(&[article("Newer")], 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("newer").is_some());
    }

    #[test]
    fn older_schema_is_ignored() {
        let (cache, _, mem) = setup();
        mem.insert_raw(NEWS_CACHE_KEY, r#"{"schema_version":0,"data":{}}"#);
        assert!(cache.is_empty());
    }
}
