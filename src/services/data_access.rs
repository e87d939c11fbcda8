use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::CacheBackend;
use crate::errors::ServiceError;
use crate::metrics::APP_METRICS;
use crate::models::series::RawValue;
use crate::repositories::HistoricalStore;

/// Fetch/persist contract consumed by the forecasting service.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// All raw values of `column` in `table`.
    async fn fetch(&self, table: &str, column: &str) -> Result<Vec<RawValue>, ServiceError>;

    /// Write `series` to the forecast column, row id = position + 1.
    async fn persist(&self, table: &str, series: &[f64]) -> Result<(), ServiceError>;
}

pub fn cache_key(table: &str, column: &str) -> String {
    format!("{}:{}", table, column)
}

/// Read-through cache in front of a [`HistoricalStore`].
///
/// Hits are served without touching the store. Misses query the store and
/// write the serialised result back with a short TTL. The cache is best
/// effort: read and write failures are logged and degrade to a miss.
pub struct CachedDataFetcher {
    store: Arc<dyn HistoricalStore>,
    cache: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl CachedDataFetcher {
    pub fn new(store: Arc<dyn HistoricalStore>, cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    async fn cached(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed; falling back to store");
                None
            }
        }
    }

    async fn write_back(&self, key: &str, values: &[RawValue]) {
        if !values.iter().all(RawValue::survives_json) {
            debug!(key = %key, "Skipping cache write for non-finite values");
            return;
        }

        let payload = match serde_json::to_string(values) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &payload, Some(self.ttl)).await {
            warn!(key = %key, error = %e, "Failed to set cache");
        }
    }
}

#[async_trait]
impl DataFetcher for CachedDataFetcher {
    async fn fetch(&self, table: &str, column: &str) -> Result<Vec<RawValue>, ServiceError> {
        let key = cache_key(table, column);

        if let Some(payload) = self.cached(&key).await {
            debug!(key = %key, "Cache hit");
            APP_METRICS.record_cache_hit();
            let values: Vec<RawValue> = serde_json::from_str(&payload).map_err(|e| {
                ServiceError::SerializationError(format!(
                    "failed to unmarshal cached data for {}: {}",
                    key, e
                ))
            })?;
            return Ok(values);
        }

        debug!(key = %key, "Cache miss");
        APP_METRICS.record_cache_miss();

        let values = self.store.fetch_column(table, column).await?;
        self.write_back(&key, &values).await;
        Ok(values)
    }

    async fn persist(&self, table: &str, series: &[f64]) -> Result<(), ServiceError> {
        // Sequential and untransacted: the first failure stops the loop and
        // rows already written stay written.
        for (index, value) in series.iter().enumerate() {
            let id = index as i64 + 1;
            self.store.update_forecast(table, id, *value).await?;
        }
        debug!(table = %table, rows = series.len(), "Persisted forecasted values");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, InMemoryCache};
    use mockall::mock;
    use mockall::predicate::*;
    use mockall::Sequence;

    mock! {
        pub Store {}

        #[async_trait]
        impl HistoricalStore for Store {
            async fn fetch_column(&self, table: &str, column: &str)
                -> Result<Vec<RawValue>, ServiceError>;
            async fn update_forecast(&self, table: &str, id: i64, value: f64)
                -> Result<(), ServiceError>;
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheBackend for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::OperationFailed("connection refused".into()))
        }
        async fn set(&self, _: &str, _: &str, _: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::OperationFailed("connection refused".into()))
        }
        async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::OperationFailed("connection refused".into()))
        }
    }

    fn fetcher(store: MockStore, cache: Arc<dyn CacheBackend>) -> CachedDataFetcher {
        CachedDataFetcher::new(Arc::new(store), cache, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn miss_then_hit_queries_store_once() {
        let mut store = MockStore::new();
        store
            .expect_fetch_column()
            .with(eq("sales_data"), eq("demand"))
            .times(1)
            .returning(|_, _| Ok(vec![RawValue::Integer(10), RawValue::Float(20.5)]));

        let cache = Arc::new(InMemoryCache::new());
        let fetcher = fetcher(store, cache.clone());

        let first = fetcher.fetch("sales_data", "demand").await.unwrap();
        assert!(cache.exists("sales_data:demand").await.unwrap());

        let second = fetcher.fetch("sales_data", "demand").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second, vec![RawValue::Integer(10), RawValue::Float(20.5)]);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_store() {
        let store = MockStore::new();
        let cache = Arc::new(InMemoryCache::new());
        cache
            .set("sales_data:demand", r#"[1,"2.5"]"#, None)
            .await
            .unwrap();

        let values = fetcher(store, cache)
            .fetch("sales_data", "demand")
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![RawValue::Integer(1), RawValue::Text("2.5".into())]
        );
    }

    #[tokio::test]
    async fn malformed_cached_payload_surfaces() {
        let store = MockStore::new();
        let cache = Arc::new(InMemoryCache::new());
        cache
            .set("sales_data:demand", "not-json", None)
            .await
            .unwrap();

        let err = fetcher(store, cache)
            .fetch("sales_data", "demand")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SerializationError(_)));
    }

    #[tokio::test]
    async fn unavailable_cache_degrades_to_store_reads() {
        let mut store = MockStore::new();
        store
            .expect_fetch_column()
            .times(2)
            .returning(|_, _| Ok(vec![RawValue::Float(3.0)]));

        let fetcher = fetcher(store, Arc::new(BrokenCache));
        for _ in 0..2 {
            let values = fetcher.fetch("sales_data", "demand").await.unwrap();
            assert_eq!(values, vec![RawValue::Float(3.0)]);
        }
    }

    #[tokio::test]
    async fn nan_history_is_never_cached() {
        let mut store = MockStore::new();
        store
            .expect_fetch_column()
            .times(2)
            .returning(|_, _| Ok(vec![RawValue::Float(1.0), RawValue::Float(f64::NAN)]));

        let cache = Arc::new(InMemoryCache::new());
        let fetcher = fetcher(store, cache.clone());

        for _ in 0..2 {
            let values = fetcher.fetch("sales_data", "demand").await.unwrap();
            assert!(matches!(values[1], RawValue::Float(v) if v.is_nan()));
            assert!(!cache.exists("sales_data:demand").await.unwrap());
        }
    }

    #[tokio::test]
    async fn store_errors_surface_on_miss() {
        let mut store = MockStore::new();
        store
            .expect_fetch_column()
            .returning(|_, _| Err(ServiceError::database_error_message("connection reset")));

        let cache = Arc::new(InMemoryCache::new());
        let err = fetcher(store, cache.clone())
            .fetch("sales_data", "demand")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
        assert!(!cache.exists("sales_data:demand").await.unwrap());
    }

    #[tokio::test]
    async fn persist_writes_each_value_by_position() {
        let mut store = MockStore::new();
        let mut seq = Sequence::new();
        for (id, value) in [(1_i64, 0.0_f64), (2, 10.0), (3, 13.0)] {
            store
                .expect_update_forecast()
                .with(eq("sales_data"), eq(id), eq(value))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| Ok(()));
        }

        fetcher(store, Arc::new(InMemoryCache::new()))
            .persist("sales_data", &[0.0, 10.0, 13.0])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn persist_stops_at_first_failure() {
        let mut store = MockStore::new();
        store
            .expect_update_forecast()
            .with(always(), eq(1_i64), always())
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_update_forecast()
            .with(always(), eq(2_i64), always())
            .times(1)
            .returning(|_, _, _| Err(ServiceError::database_error_message("lock timeout")));

        let err = fetcher(store, Arc::new(InMemoryCache::new()))
            .persist("sales_data", &[0.0, 10.0, 13.0, 15.0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
