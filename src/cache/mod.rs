// ARCHITECTURE: TTL Cache - Time-Bounded Response Cache
//
// Generic key/value store with per-entry absolute expiration. Downstream
// handlers use it to avoid recomputing expensive results; the cache makes
// no assumption about what they store beyond the value being cloneable.
//
// 1. EXPIRY ON READ: a logically expired entry is never returned, even if
//    it is still physically present
// 2. BACKGROUND SWEEP: a periodic task removes expired entries; readers
//    and writers never wait on the sweeper beyond normal lock acquisition
// 3. PREFIX INVALIDATION: cached results tied to a changed resource are
//    dropped by key prefix

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// STATISTICS: counts of physically stored entries. `expired` covers
// entries whose TTL has passed but which the sweeper has not yet removed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub total_items: usize,
    pub expired_items: usize,
    pub active_items: usize,
}

// CORE SYSTEM: TtlCache - generic TTL cache with background eviction
pub struct TtlCache<V> {
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    sweep_interval: Duration,
    sweep_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // CONSTRUCTOR: create a cache sweeping at the given interval
    pub fn new(sweep_interval: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweep_interval,
            sweep_handle: Arc::new(RwLock::new(None)),
        }
    }

    // LIFECYCLE: start the background sweep task
    pub async fn start(&self) {
        let entries = Arc::clone(&self.entries);
        let sweep_interval = self.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await; // first tick fires immediately

            loop {
                interval.tick().await;

                let now = Utc::now();
                let mut entries = entries.write().await;
                let initial_count = entries.len();
                entries.retain(|_, entry| !entry.is_expired(now));
                let swept = initial_count - entries.len();
                drop(entries);

                if swept > 0 {
                    debug!(swept_entries = swept, "Swept expired cache entries");
                }
            }
        });

        *self.sweep_handle.write().await = Some(handle);
        info!(
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "TTL cache started"
        );
    }

    // LIFECYCLE: stop the background sweep task
    pub async fn stop(&self) {
        if let Some(handle) = self.sweep_handle.write().await.take() {
            handle.abort();
        }
        info!("TTL cache stopped");
    }

    // CORE FUNCTION: store a value, overwriting any existing entry
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());

        self.entries
            .write()
            .await
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    // CORE FUNCTION: fetch a value; absent and expired are indistinguishable
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if entry.is_expired(Utc::now()) {
            return None;
        }

        Some(entry.value.clone())
    }

    // Remove a single entry; no-op when the key is absent.
    pub async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    // Remove all entries atomically with respect to concurrent get/set.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    // Drop every entry whose key starts with `prefix`; returns the number
    // of entries removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let initial_count = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = initial_count - entries.len();

        if removed > 0 {
            debug!(prefix = %prefix, removed, "Invalidated cache entries by prefix");
        }
        removed
    }

    // Informational only; never mutates state as a side effect.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let now = Utc::now();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();

        CacheStats {
            total_items: entries.len(),
            expired_items: expired,
            active_items: entries.len() - expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn cache() -> TtlCache<String> {
        TtlCache::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_set_then_get_within_ttl() {
        let cache = cache();
        cache.set("alerts:list", "payload".to_string(), Duration::from_secs(60)).await;

        assert_eq!(cache.get("alerts:list").await, Some("payload".to_string()));
    }

    #[tokio::test]
    async fn test_get_after_ttl_elapsed_without_sweep() {
        let cache = cache();
        cache.set("k", "v".to_string(), Duration::from_millis(50)).await;

        sleep(Duration::from_millis(80)).await;

        // Entry is still physically present (no sweep has run) but must
        // not be returned.
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.stats().await.total_items, 1);
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_entry() {
        let cache = cache();
        cache.set("k", "old".to_string(), Duration::from_secs(60)).await;
        cache.set("k", "new".to_string(), Duration::from_secs(60)).await;

        assert_eq!(cache.get("k").await, Some("new".to_string()));
        assert_eq!(cache.stats().await.total_items, 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = cache();
        cache.set("a", "1".to_string(), Duration::from_secs(60)).await;
        cache.set("b", "2".to_string(), Duration::from_secs(60)).await;

        cache.delete("a").await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some("2".to_string()));

        // Deleting a missing key is a no-op.
        cache.delete("a").await;

        cache.clear().await;
        assert_eq!(cache.stats().await.total_items, 0);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_removes_matching_keys_only() {
        let cache = cache();
        cache.set("alerts:1", "a".to_string(), Duration::from_secs(60)).await;
        cache.set("alerts:2", "b".to_string(), Duration::from_secs(60)).await;
        cache.set("threats:1", "c".to_string(), Duration::from_secs(60)).await;

        let removed = cache.invalidate_prefix("alerts:").await;

        assert_eq!(removed, 2);
        assert_eq!(cache.get("alerts:1").await, None);
        assert_eq!(cache.get("threats:1").await, Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_stats_counts_expired_without_mutating() {
        let cache = cache();
        cache.set("live", "1".to_string(), Duration::from_secs(60)).await;
        cache.set("dead", "2".to_string(), Duration::from_millis(30)).await;

        sleep(Duration::from_millis(60)).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.expired_items, 1);
        assert_eq!(stats.active_items, 1);

        // Querying stats must not have removed anything.
        assert_eq!(cache.stats().await.total_items, 2);
    }

    #[tokio::test]
    async fn test_background_sweep_removes_expired_entries() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_millis(50));
        cache.start().await;

        cache.set("k", "v".to_string(), Duration::from_millis(20)).await;
        sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.stats().await.total_items, 0);
        cache.stop().await;
    }
}
