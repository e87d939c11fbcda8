//! Demand Forecast API Library
//!
//! Demand projection by single exponential smoothing over historical sales
//! tables, plus the economic-order-quantity and total-cost figures derived
//! from it, served over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod ml;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{http::Method, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::CacheBackend;
use crate::repositories::SeaOrmHistoricalStore;
use crate::services::data_access::CachedDataFetcher;
use crate::services::forecasting::ForecastingService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub forecasting: Arc<ForecastingService>,
    pub cache: Arc<dyn CacheBackend>,
}

impl AppState {
    /// Wire the store, the read-through cache and the orchestrator together.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        cache: Arc<dyn CacheBackend>,
    ) -> Self {
        let store = Arc::new(SeaOrmHistoricalStore::new(db.clone()));
        let fetcher = Arc::new(CachedDataFetcher::new(
            store,
            cache.clone(),
            config.cache.ttl(),
        ));
        let forecasting = Arc::new(ForecastingService::new(
            fetcher,
            config.forecast.clone(),
        ));

        Self {
            db,
            config,
            forecasting,
            cache,
        }
    }
}

/// Full HTTP surface: forecasting routes, health, metrics and API docs.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "demand-forecast-api up" }))
        .merge(handlers::forecast::forecast_routes())
        .merge(handlers::health::health_routes())
        .route("/metrics", get(metrics::metrics_handler))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
