use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::ForecastConfig;
use crate::errors::ServiceError;
use crate::ml::forecasting::{self, TotalCost};
use crate::models::series::{normalize_series, CostResult, EoqResult, ForecastPoint};
use crate::repositories::historical_store::DEMAND_COLUMN;
use crate::services::data_access::DataFetcher;

/// Months in one reporting cycle.
const MONTHS_PER_YEAR: usize = 12;

/// Month reported for a series of `len` observations.
///
/// A full number of years wraps around to month 1; otherwise the forecast is
/// for the month after the last observation.
pub fn reporting_month(len: usize) -> u32 {
    if len % MONTHS_PER_YEAR == 0 {
        1
    } else {
        (len + 1) as u32
    }
}

/// Forecast orchestrator: fetch, normalise, smooth, persist, report.
pub struct ForecastingService {
    fetcher: Arc<dyn DataFetcher>,
    config: ForecastConfig,
}

impl ForecastingService {
    pub fn new(fetcher: Arc<dyn DataFetcher>, config: ForecastConfig) -> Self {
        Self { fetcher, config }
    }

    /// Project the demand of `table` one period ahead.
    ///
    /// The full smoothed series is written back to the table before the
    /// final point is returned; a failed write discards the forecast.
    #[instrument(skip(self))]
    pub async fn generate_forecast(&self, table: &str) -> Result<ForecastPoint, ServiceError> {
        let raw = self.fetcher.fetch(table, DEMAND_COLUMN).await?;
        let demand = normalize_series(&raw)?;
        info!(table = %table, observations = demand.len(), "Fetched demand data");

        let smoothed = forecasting::exponential_smoothing(&demand, self.config.alpha)?;

        self.fetcher.persist(table, &smoothed.values).await?;
        info!(table = %table, rows = smoothed.values.len(), "Stored forecasted values");

        Ok(ForecastPoint {
            month: reporting_month(smoothed.values.len()),
            value: smoothed.next,
        })
    }

    pub fn calculate_eoq(&self, demand: f64) -> f64 {
        forecasting::economic_order_quantity(
            demand,
            self.config.holding_cost_rate,
            self.config.ordering_cost,
        )
    }

    pub fn get_cost(&self, demand: f64, eoq: f64) -> TotalCost {
        forecasting::total_cost(
            self.config.stock_quantity,
            self.config.holding_cost_rate,
            self.config.ordering_cost,
            demand,
            eoq,
        )
    }

    pub fn get_holding_cost(&self) -> f64 {
        forecasting::holding_cost(self.config.holding_cost_rate)
    }

    /// EOQ of the projected demand for `table`.
    pub async fn eoq_report(&self, table: &str) -> Result<EoqResult, ServiceError> {
        let forecast = self.generate_forecast(table).await?;
        Ok(EoqResult {
            eoq: self.calculate_eoq(forecast.value),
            holding_cost_rate: self.get_holding_cost(),
        })
    }

    /// Total-cost comparison for the projected demand of `table`.
    pub async fn cost_report(&self, table: &str) -> Result<CostResult, ServiceError> {
        let forecast = self.generate_forecast(table).await?;
        let eoq = self.calculate_eoq(forecast.value);
        let cost = self.get_cost(forecast.value, eoq);
        Ok(CostResult {
            eoq_total_cost: cost.eoq_total_cost,
            shortage_total_cost: cost.shortage_total_cost,
        })
    }
}
