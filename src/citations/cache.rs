//! In-memory citation count cache with an injected clock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::ApiSource;

/// Default lifetime of a cached count
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *lock(&self.now) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    count: u32,
    fetched_at: DateTime<Utc>,
}

/// Citation counts keyed by `(identifier, source)`
///
/// An entry older than the TTL is stale: `get` drops it and reports a miss,
/// so the caller refetches.
#[derive(Debug)]
pub struct CitationCache {
    entries: Mutex<HashMap<(String, ApiSource), CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl Default for CitationCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CitationCache {
    /// Create a cache with the default 24 hour TTL
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// Fresh count for `id` from `source`, if any
    pub fn get(&self, id: &str, source: ApiSource) -> Option<u32> {
        let now = self.clock.now();
        let key = (id.to_string(), source);
        let mut entries = lock(&self.entries);

        match entries.get(&key) {
            Some(entry) if now - entry.fetched_at < self.ttl => Some(entry.count),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, id: &str, source: ApiSource, count: u32) {
        let entry = CacheEntry {
            count,
            fetched_at: self.clock.now(),
        };
        lock(&self.entries).insert((id.to_string(), source), entry);
    }

    /// Drop every stale entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| now - entry.fetched_at < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = clock();
        let cache = CitationCache::new(clock.clone());
        cache.insert("123", ApiSource::PubMed, 7);

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get("123", ApiSource::PubMed), Some(7));
    }

    #[test]
    fn test_stale_after_ttl() {
        let clock = clock();
        let cache = CitationCache::new(clock.clone());
        cache.insert("123", ApiSource::PubMed, 7);

        clock.advance(Duration::hours(24));
        assert_eq!(cache.get("123", ApiSource::PubMed), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_includes_source() {
        let cache = CitationCache::new(clock());
        cache.insert("123", ApiSource::PubMed, 7);
        assert_eq!(cache.get("123", ApiSource::Pmc), None);
    }

    #[test]
    fn test_purge_expired() {
        let clock = clock();
        let cache = CitationCache::with_ttl(clock.clone(), Duration::minutes(10));
        cache.insert("old", ApiSource::Pmc, 1);
        clock.advance(Duration::minutes(9));
        cache.insert("new", ApiSource::Pmc, 2);
        clock.advance(Duration::minutes(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new", ApiSource::Pmc), Some(2));
    }
}
