//! Single exponential smoothing and the economic-order-quantity cost model.
//!
//! Everything here is pure: no I/O, no shared state. The orchestration that
//! fetches demand and persists the projection lives in
//! [`crate::services::forecasting`].

use crate::errors::ServiceError;

/// Periods covered by one ordering cycle; scales per-period demand in both
/// the EOQ and the shortage formulas.
pub const PERIODS_PER_CYCLE: f64 = 50.0;

/// Overhead factor applied to the configured holding-cost rate when it is
/// reported.
pub const HOLDING_COST_OVERHEAD: f64 = 0.06;

/// Output of [`exponential_smoothing`].
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedSeries {
    /// One value per input observation. Slot 0 is a zero sentinel and slot 1
    /// is the bootstrap (the first observation), so the series trails the
    /// demand by one period.
    pub values: Vec<f64>,
    /// Forecast for the period after the last observation.
    pub next: f64,
}

fn smoothing_step(level: f64, observation: f64, alpha: f64) -> f64 {
    level + alpha * (observation - level)
}

/// Smooth `demand` with factor `alpha`.
///
/// `out[0] = 0`, `out[1] = demand[0]` and `out[i] = out[i-1] + alpha *
/// (demand[i-1] - out[i-1])` for `i >= 2`. The next-period forecast is one more
/// step from the last output value towards the last observation. A single
/// observation yields `[0]` with that observation as the next forecast.
pub fn exponential_smoothing(demand: &[f64], alpha: f64) -> Result<SmoothedSeries, ServiceError> {
    let (&first, &last) = match (demand.first(), demand.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ServiceError::EmptySeries(
                "demand data is empty".to_string(),
            ))
        }
    };

    let mut values = Vec::with_capacity(demand.len());
    values.push(0.0);
    if demand.len() == 1 {
        return Ok(SmoothedSeries {
            values,
            next: first,
        });
    }

    values.push(first);
    for i in 2..demand.len() {
        let previous = values[i - 1];
        values.push(smoothing_step(previous, demand[i - 1], alpha));
    }

    let level = values[values.len() - 1];
    Ok(SmoothedSeries {
        next: smoothing_step(level, last, alpha),
        values,
    })
}

/// `sqrt(2 * demand * PERIODS_PER_CYCLE * ordering_cost / holding_cost_rate)`,
/// or 0 when any input is not strictly positive.
pub fn economic_order_quantity(demand: f64, holding_cost_rate: f64, ordering_cost: f64) -> f64 {
    if demand <= 0.0 || holding_cost_rate <= 0.0 || ordering_cost <= 0.0 {
        return 0.0;
    }

    ((2.0 * demand * PERIODS_PER_CYCLE * ordering_cost) / holding_cost_rate).sqrt()
}

/// Total-cost figures for one ordering cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalCost {
    /// `ordering_cost + holding_cost_rate * (demand * PERIODS_PER_CYCLE - stock)`
    pub shortage_total_cost: f64,
    /// `eoq * holding_cost_rate + (demand / eoq) * ordering_cost`
    pub eoq_total_cost: f64,
}

/// Compute both total-cost figures.
///
/// When `eoq` is 0 the ordering term `(demand / eoq) * ordering_cost` is taken
/// as 0, so the EOQ total cost collapses to `0 * holding_cost_rate = 0`.
pub fn total_cost(
    stock_quantity: f64,
    holding_cost_rate: f64,
    ordering_cost: f64,
    demand: f64,
    eoq: f64,
) -> TotalCost {
    let shortage = demand * PERIODS_PER_CYCLE - stock_quantity;
    let shortage_total_cost = ordering_cost + holding_cost_rate * shortage;

    let ordering_term = if eoq == 0.0 {
        0.0
    } else {
        (demand / eoq) * ordering_cost
    };
    let eoq_total_cost = eoq * holding_cost_rate + ordering_term;

    TotalCost {
        shortage_total_cost,
        eoq_total_cost,
    }
}

pub fn holding_cost(holding_cost_rate: f64) -> f64 {
    holding_cost_rate * HOLDING_COST_OVERHEAD
}
