// Database layer for Courier services
// Postgres pool, row models, repositories and cache stores

pub mod models;
pub mod repositories;
pub mod config;
pub mod cache;

// Re-export commonly used items
pub use sqlx;
pub use uuid;
pub use chrono;
pub use config::DatabaseConfig;
pub use cache::{CacheKeyBuilder, CacheStore, MemoryCache, RedisCache, TimedCache};
pub use repositories::RepositoryManager;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use anyhow::{Result, Context};

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    cache: Option<RedisCache>,
}

impl Database {
    /// Create a new database instance from configuration.
    ///
    /// Redis is only dialed when `use_redis` is set; a failed connection is
    /// logged and the instance falls back to no shared cache.
    pub async fn new(config: &DatabaseConfig, use_redis: bool) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        let cache = match (&config.redis_url, use_redis) {
            (Some(redis_url), true) => match RedisCache::new(redis_url).await {
                Ok(c) => {
                    tracing::info!("Connected to Redis");
                    Some(c)
                }
                Err(e) => {
                    tracing::warn!("Redis connection disabled due to error: {}", e);
                    None
                }
            },
            _ => None,
        };

        Ok(Self { pool, cache })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the Redis cache if available
    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }

    /// Redis when connected, otherwise the in-memory TTL cache
    pub fn cache_store(&self) -> Arc<dyn CacheStore> {
        match &self.cache {
            Some(redis) => Arc::new(redis.clone()),
            None => Arc::new(MemoryCache::default()),
        }
    }

    pub fn repositories(&self) -> RepositoryManager {
        RepositoryManager::new(self.pool.clone())
    }
}
