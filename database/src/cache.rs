use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Key/value store with per-entry TTL, holding JSON strings.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Round-trip check used by health endpoints
    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

impl dyn CacheStore {
    /// Get a value from cache
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str)
                    .with_context(|| format!("Failed to deserialize cached value for {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache with TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json_str = serde_json::to_string(value).context("Failed to serialize cache value")?;
        self.set_raw(key, json_str, ttl).await
    }
}

/// Redis cache wrapper
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

struct MemoryEntry {
    value: String,
    created_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// In-process TTL cache used when Redis is toggled off
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, MemoryEntry>>,
    max_entries: usize,
    stats: Arc<RwLock<CacheStats>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Drops expired entries first, then the oldest one if still full
    fn make_room(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let mut evicted = before - self.entries.len();

        if self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
                evicted += 1;
            }
        }

        self.stats.write().evictions += evicted as u64;
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.value.clone()));

        let hit = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove(key);
                None
            }
            None => None,
        };

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        Ok(hit)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }

        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Cache handle that bounds every call by a timeout. Failures and timeouts
/// are logged and treated as misses so callers fall through to the source.
#[derive(Clone)]
pub struct TimedCache {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl TimedCache {
    pub fn new(store: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match tokio::time::timeout(self.timeout, self.store.get_json::<T>(key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, bypassing cache");
                None
            }
            Err(_) => {
                tracing::warn!(key = %key, timeout_ms = self.timeout.as_millis() as u64, "Cache read timed out, bypassing cache");
                None
            }
        }
    }

    /// Returns whether the value was stored
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match tokio::time::timeout(self.timeout, self.store.set_json(key, value, ttl)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Cache write failed, continuing without cache");
                false
            }
            Err(_) => {
                tracing::warn!(key = %key, timeout_ms = self.timeout.as_millis() as u64, "Cache write timed out, continuing without cache");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        match tokio::time::timeout(self.timeout, self.store.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(key = %key, error = %e, "Cache invalidation failed"),
            Err(_) => tracing::warn!(key = %key, "Cache invalidation timed out"),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        matches!(tokio::time::timeout(self.timeout, self.store.ping()).await, Ok(Ok(())))
    }
}

/// Cache key builder for consistent key naming
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    pub fn report(
        organization_id: &str,
        report_type: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> String {
        format!(
            "report:{}:{}:{}:{}",
            organization_id,
            report_type,
            start.to_rfc3339(),
            end.to_rfc3339()
        )
    }

    pub fn dashboard(organization_id: &str, period: &str) -> String {
        format!("dashboard_metrics:{}:{}", organization_id, period)
    }

    pub fn contact(contact_id: &Uuid) -> String {
        format!("contact_service:contact:{}", contact_id)
    }

    pub fn group(group_id: &Uuid) -> String {
        format!("group:{}", group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        cache
            .set_json("k", &serde_json::json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<serde_json::Value> = cache.get_json("k").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"a": 1})));

        cache.delete("k").await.unwrap();
        let value: Option<serde_json::Value> = cache.get_json("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_ttl_expiry() {
        let cache = MemoryCache::default();
        cache
            .set_raw("short", "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(cache.get_raw("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get_raw("short").await.unwrap().is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_memory_cache_evicts_when_full() {
        let cache = MemoryCache::new(2);
        tokio_test::block_on(async {
            for key in ["a", "b", "c"] {
                cache
                    .set_raw(key, key.to_string(), Duration::from_secs(60))
                    .await
                    .unwrap();
            }
        });

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_key_formats() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        assert_eq!(
            CacheKeyBuilder::report("org-1", "delivery", &start, &end),
            "report:org-1:delivery:2024-01-01T00:00:00+00:00:2024-01-02T00:00:00+00:00"
        );
        assert_eq!(
            CacheKeyBuilder::dashboard("org-1", "day"),
            "dashboard_metrics:org-1:day"
        );
        let id = Uuid::nil();
        assert_eq!(
            CacheKeyBuilder::contact(&id),
            format!("contact_service:contact:{}", id)
        );
        assert_eq!(CacheKeyBuilder::group(&id), format!("group:{}", id));
    }
}
