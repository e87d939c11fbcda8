use axum::{
    extract::{Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;
use utoipa::IntoParams;

use crate::{
    errors::ServiceError,
    metrics::request_metrics_middleware,
    models::series::{CostResult, EoqResult, ForecastPoint},
    AppState,
};

/// Forecasting routes. Requests to these are counted in `http_requests_total`.
pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/forecast", get(get_forecast))
        .route("/EOQ", get(get_eoq))
        .route("/cost", get(get_cost))
        .route_layer(middleware::from_fn(request_metrics_middleware))
}

/// Query parameters shared by the forecasting endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TableQuery {
    /// Name of the demand table
    #[serde(default)]
    #[param(example = "sales_data")]
    pub table: String,
}

impl TableQuery {
    fn table(&self) -> &str {
        if self.table.is_empty() {
            warn!("table parameter is missing");
        }
        &self.table
    }
}

/// Forecast next month's demand from the table's history
#[utoipa::path(
    get,
    path = "/forecast",
    params(TableQuery),
    responses(
        (status = 200, description = "Projected demand for the next month", body = ForecastPoint),
        (status = 500, description = "Forecast could not be generated", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasting"
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<TableQuery>,
) -> Result<Json<ForecastPoint>, ServiceError> {
    let point = state.forecasting.generate_forecast(params.table()).await?;
    Ok(Json(point))
}

/// Economic order quantity for the projected demand
#[utoipa::path(
    get,
    path = "/EOQ",
    params(TableQuery),
    responses(
        (status = 200, description = "EOQ and the reported holding cost", body = EoqResult),
        (status = 500, description = "Forecast could not be generated", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasting"
)]
pub async fn get_eoq(
    State(state): State<AppState>,
    Query(params): Query<TableQuery>,
) -> Result<Json<EoqResult>, ServiceError> {
    let report = state.forecasting.eoq_report(params.table()).await?;
    Ok(Json(report))
}

/// Total cost of ordering the EOQ versus covering the shortage
#[utoipa::path(
    get,
    path = "/cost",
    params(TableQuery),
    responses(
        (status = 200, description = "Total-cost comparison", body = CostResult),
        (status = 500, description = "Forecast could not be generated", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasting"
)]
pub async fn get_cost(
    State(state): State<AppState>,
    Query(params): Query<TableQuery>,
) -> Result<Json<CostResult>, ServiceError> {
    let report = state.forecasting.cost_report(params.table()).await?;
    Ok(Json(report))
}
