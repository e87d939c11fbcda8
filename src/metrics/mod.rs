/*!
 * # Metrics Module
 *
 * In-process counters for the forecasting API, exposed in Prometheus text
 * format at `/metrics`.
 *
 * - `http_requests_total`: requests to the forecasting routes
 * - `http_request_duration_seconds`: latency of those requests
 * - `cache_hits_total` / `cache_misses_total`: read-through cache outcomes
 * - `errors_total`: forecasting requests answered with a server error
 */

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::error;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Count and running sum of observations, in microseconds internally.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, duration: Duration) {
        self.sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of observations in seconds
    pub fn get_sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    /// Render every metric in Prometheus text format, sorted by name.
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        use std::fmt::Write;

        let mut counters: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().get()))
            .collect();
        counters.sort_by(|a, b| a.0.cmp(&b.0));

        let mut histograms: Vec<(String, u64, f64)> = self
            .histograms
            .iter()
            .map(|entry| {
                let h = entry.value();
                (entry.key().clone(), h.get_count(), h.get_sum())
            })
            .collect();
        histograms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        let write_err = |e: std::fmt::Error| MetricsError::ExportError(e.to_string());

        for (name, value) in counters {
            writeln!(output, "# TYPE {} counter", name).map_err(write_err)?;
            writeln!(output, "{} {}", name, value).map_err(write_err)?;
        }
        for (name, count, sum) in histograms {
            writeln!(output, "# TYPE {} summary", name).map_err(write_err)?;
            writeln!(output, "{}_count {}", name, count).map_err(write_err)?;
            writeln!(output, "{}_sum {}", name, sum).map_err(write_err)?;
        }

        Ok(output)
    }
}

// Global metrics registry
lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

pub struct AppMetrics {
    pub requests_total: Counter,
    pub requests_duration: Histogram,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub errors_total: Counter,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: METRICS.get_or_create_counter("http_requests_total"),
            requests_duration: METRICS.get_or_create_histogram("http_request_duration_seconds"),
            cache_hits: METRICS.get_or_create_counter("cache_hits_total"),
            cache_misses: METRICS.get_or_create_counter("cache_misses_total"),
            errors_total: METRICS.get_or_create_counter("errors_total"),
        }
    }

    pub fn record_request(&self, duration: Duration) {
        self.requests_total.inc();
        self.requests_duration.observe(duration);
    }

    pub fn record_error(&self) {
        self.errors_total.inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    pub static ref APP_METRICS: AppMetrics = AppMetrics::new();
}

/// Counts every request passing through the wrapped routes.
pub async fn request_metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;

    APP_METRICS.record_request(start.elapsed());
    if response.status().is_server_error() {
        APP_METRICS.record_error();
    }
    response
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match METRICS.export_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_is_sorted_prometheus_text() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("zeta_total").inc();
        let alpha = registry.get_or_create_counter("alpha_total");
        alpha.inc();
        alpha.inc();
        registry
            .get_or_create_histogram("latency_seconds")
            .observe(Duration::from_millis(1500));

        let text = registry.export_metrics().unwrap();
        let alpha_at = text.find("alpha_total 2").unwrap();
        let zeta_at = text.find("zeta_total 1").unwrap();
        assert!(alpha_at < zeta_at);
        assert!(text.contains("# TYPE alpha_total counter"));
        assert!(text.contains("latency_seconds_count 1"));
        assert!(text.contains("latency_seconds_sum 1.5"));
    }

    #[test]
    fn counters_are_shared_by_name() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("hits").inc();
        registry.get_or_create_counter("hits").inc();
        assert_eq!(registry.get_or_create_counter("hits").get(), 2);
    }

    #[test]
    fn app_metrics_register_in_the_global_registry() {
        let before = APP_METRICS.cache_hits.get();
        APP_METRICS.record_cache_hit();
        assert!(METRICS.get_or_create_counter("cache_hits_total").get() > before);
    }
}
