use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Demand Forecast API",
        version = "1.0.0",
        description = r#"
# Demand Forecast API

Projects next month's demand for a product table with single exponential
smoothing and derives inventory figures from the projection.

## Endpoints

- `GET /forecast?table=<name>`: projected demand for the next month
- `GET /EOQ?table=<name>`: economic order quantity and holding cost
- `GET /cost?table=<name>`: total cost of ordering the EOQ versus the shortage

Each call regenerates the forecast and writes the smoothed series back to the
table's `forecasted_value` column.

## Error Handling

Every failure is reported as `500 Internal Server Error` with the error text
in `message`.
"#
    ),
    paths(
        crate::handlers::forecast::get_forecast,
        crate::handlers::forecast::get_eoq,
        crate::handlers::forecast::get_cost,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::models::series::ForecastPoint,
            crate::models::series::EoqResult,
            crate::models::series::CostResult,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::HealthDetails,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ComponentStatus,
            crate::errors::ErrorResponse
        )
    ),
    tags(
        (name = "Forecasting", description = "Demand projection and inventory cost"),
        (name = "Health", description = "Dependency connectivity")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_forecasting_paths() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Demand Forecast API"));
        assert!(json.contains("/forecast"));
        assert!(json.contains("/EOQ"));
        assert!(json.contains("/cost"));
        assert!(json.contains("Forecasted Demand"));
    }
}
