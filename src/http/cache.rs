//! Process-local TTL cache for upstream responses.
//!
//! Entries expire at `set_time + ttl`; an expired entry reads as absent and
//! is dropped on the next lookup. There is no size bound, only a sweep of
//! expired entries once the map grows past a threshold.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Entry count above which `set` sweeps expired entries.
const SWEEP_THRESHOLD: usize = 500;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value for `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                trace!(key, "cache entry expired");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();
        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, e| !e.is_expired(now));
        }
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including ones that have expired but not
    /// yet been evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic cache key: params are sorted so that logically identical
/// requests collide regardless of insertion order.
pub fn cache_key(scope: &str, url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{scope}:{url}:{}", query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_until_expiry() {
        let cache = TtlCache::new();
        cache.set("k", json!("v"), Duration::from_secs(10));
        assert_eq!(cache.get("k"), Some(json!("v")));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get("k"), Some(json!("v")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_miss_returns_none() {
        let cache = TtlCache::new();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn test_zero_ttl_is_immediately_absent() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::ZERO);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::ZERO);
        assert_eq!(cache.len(), 1);
        let _ = cache.get("k");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(60));
        cache.set("k", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_sweep_drops_expired_when_large() {
        let cache = TtlCache::new();
        for i in 0..=SWEEP_THRESHOLD {
            cache.set(format!("old{i}"), json!(i), Duration::ZERO);
        }
        cache.set("fresh", json!(true), Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_key_sorts_params() {
        let a = cache_key(
            "espn",
            "https://x/scoreboard",
            &[("week".into(), "3".into()), ("dates".into(), "2025".into())],
        );
        let b = cache_key(
            "espn",
            "https://x/scoreboard",
            &[("dates".into(), "2025".into()), ("week".into(), "3".into())],
        );
        assert_eq!(a, b);
        assert_eq!(a, "espn:https://x/scoreboard:dates=2025&week=3");
    }
}
