use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use demand_forecast_api::{
    cache::{CacheBackend, InMemoryCache},
    config::AppConfig,
    db,
    repositories::historical_store::{create_demand_table, insert_demand, reset_demand_table},
    AppState,
};
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::Value;
use tower::ServiceExt;

/// Helper harness for spinning up the full router over an in-memory SQLite
/// database and an in-memory cache.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub cache: Arc<InMemoryCache>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "redis://127.0.0.1:6379".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cache.cache_type = "in-memory".to_string();

        let pool = db::establish_connection_with_config(&db::in_memory_sqlite_config())
            .await
            .expect("failed to create test database");

        let cache = Arc::new(InMemoryCache::new());
        let backend: Arc<dyn CacheBackend> = cache.clone();
        let state = AppState::new(Arc::new(pool), cfg, backend);
        let router = demand_forecast_api::build_router(state.clone());

        Self {
            router,
            state,
            cache,
        }
    }

    /// Create `table` and insert the given demand history.
    pub async fn seed_demand(&self, table: &str, values: &[f64]) {
        create_demand_table(&self.state.db, table)
            .await
            .expect("create demand table");
        insert_demand(&self.state.db, table, values)
            .await
            .expect("insert demand rows");
    }

    /// Recreate `table` and insert the given demand history.
    #[allow(dead_code)]
    pub async fn reseed_demand(&self, table: &str, values: &[f64]) {
        reset_demand_table(&self.state.db, table)
            .await
            .expect("reset demand table");
        insert_demand(&self.state.db, table, values)
            .await
            .expect("insert demand rows");
    }

    /// Run raw SQL against the test database.
    #[allow(dead_code)]
    pub async fn execute(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("execute test sql");
    }

    /// Forecast column of `table`, in id order.
    #[allow(dead_code)]
    pub async fn forecasted_values(&self, table: &str) -> Vec<Option<f64>> {
        let rows = self
            .state
            .db
            .query_all(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT forecasted_value FROM {} ORDER BY id", table),
            ))
            .await
            .expect("query forecasted values");
        rows.iter()
            .map(|row| {
                row.try_get_by_index::<Option<f64>>(0)
                    .expect("decode forecasted value")
            })
            .collect()
    }

    /// Send a GET request against the router.
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Method::GET, uri, &[]).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder.body(Body::empty()).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Split a response into its status and JSON body.
pub async fn json_body(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let value = serde_json::from_slice(&bytes).expect("response body is json");
    (status, value)
}

/// Response body as text.
#[allow(dead_code)]
pub async fn text_body(response: axum::response::Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
