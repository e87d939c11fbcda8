// Cache backends for the read-through layer in front of the historical store

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CacheConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Unsupported cache type: {0}")]
    UnsupportedBackend(String),
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

// In-memory cache implementation, used for tests and single-node setups
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn lock_poisoned() -> CacheError {
        CacheError::OperationFailed("cache lock poisoned".to_string())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let store = self.store.read().map_err(|_| Self::lock_poisoned())?;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict on read
        let mut store = self.store.write().map_err(|_| Self::lock_poisoned())?;
        store.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().map_err(|_| Self::lock_poisoned())?;
        store.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let store = self.store.read().map_err(|_| Self::lock_poisoned())?;
        Ok(store.get(key).map_or(false, |entry| !entry.is_expired()))
    }
}

#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Round-trips a PING; used at start-up where an unreachable cache is fatal.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let result: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        match ttl {
            Some(ttl) => {
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(ttl.as_secs().max(1))
                    .arg(value)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
            None => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let found: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found)
    }
}

// Cache factory
pub struct CacheFactory;

impl CacheFactory {
    pub async fn create_cache(
        config: &CacheConfig,
        default_redis_url: &str,
    ) -> Result<Arc<dyn CacheBackend>, CacheError> {
        match config.cache_type.to_ascii_lowercase().as_str() {
            "in-memory" => {
                info!("Using in-memory cache backend");
                Ok(Arc::new(InMemoryCache::new()))
            }
            "redis" => {
                let url = config.redis_url.as_deref().unwrap_or(default_redis_url);
                let cache = RedisCache::new(url)?;
                cache.ping().await.map_err(|e| {
                    warn!(error = %e, "Redis cache is unreachable");
                    e
                })?;
                info!("Connected to Redis cache");
                Ok(Arc::new(cache))
            }
            other => Err(CacheError::UnsupportedBackend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let cache = InMemoryCache::new();
        cache.set("sales:demand", "[1,2]", None).await.unwrap();

        assert_eq!(
            cache.get("sales:demand").await.unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(cache.exists("sales:demand").await.unwrap());

        cache.set("sales:demand", "[3]", None).await.unwrap();
        assert_eq!(
            cache.get("sales:demand").await.unwrap().as_deref(),
            Some("[3]")
        );
        assert!(!cache.exists("sales:other").await.unwrap());
    }

    #[tokio::test]
    async fn in_memory_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(cache.exists("k").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!cache.exists("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn factory_builds_in_memory_backend() {
        let config = CacheConfig {
            cache_type: "in-memory".into(),
            ..Default::default()
        };
        let cache = CacheFactory::create_cache(&config, "redis://127.0.0.1:6379")
            .await
            .unwrap();
        cache.set("a", "b", None).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn factory_rejects_unknown_backend() {
        let config = CacheConfig {
            cache_type: "memcached".into(),
            ..Default::default()
        };
        let result = CacheFactory::create_cache(&config, "redis://127.0.0.1:6379").await;
        assert!(matches!(result, Err(CacheError::UnsupportedBackend(_))));
    }
}
