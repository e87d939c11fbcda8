use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// A single value read from a demand column.
///
/// Storage columns are heterogeneous (integer, floating point, decimal or
/// textual numbers), so rows are decoded into this tagged form and normalised
/// explicitly with [`RawValue::to_f64`]. The untagged serde representation is
/// what gets written to the cache, so a cached `[10, 20.5, "30"]` reads back
/// with the same variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl RawValue {
    /// Normalise to a 64-bit float. Text is parsed; `Null`, NaN and the
    /// infinities are unsupported.
    pub fn to_f64(&self) -> Result<f64, ServiceError> {
        let value = match self {
            RawValue::Float(v) => *v,
            RawValue::Integer(v) => return Ok(*v as f64),
            RawValue::Text(s) => s.trim().parse::<f64>().map_err(|e| {
                ServiceError::ConversionError(format!(
                    "failed to parse string value to float64: {} (value: {})",
                    e, s
                ))
            })?,
            RawValue::Null => {
                return Err(ServiceError::ConversionError(
                    "failed to convert demand data to float64: unsupported NULL value".to_string(),
                ))
            }
        };

        if !value.is_finite() {
            return Err(ServiceError::ConversionError(format!(
                "failed to convert demand data to float64: non-finite value {}",
                value
            )));
        }
        Ok(value)
    }

    /// JSON has no NaN or infinity; such floats would read back as `Null`.
    pub fn survives_json(&self) -> bool {
        match self {
            RawValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

/// Normalise a whole column, failing on the first unsupported value.
pub fn normalize_series(values: &[RawValue]) -> Result<Vec<f64>, ServiceError> {
    values.iter().map(RawValue::to_f64).collect()
}

/// The surfaced point of a projected series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastPoint {
    /// Month of the projection, 1-based
    #[serde(rename = "Month")]
    pub month: u32,
    /// Projected demand for that month
    #[serde(rename = "Forecasted Demand")]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EoqResult {
    #[serde(rename = "EOQ")]
    pub eoq: f64,
    #[serde(rename = "HoldingCostRate")]
    pub holding_cost_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostResult {
    #[serde(rename = "For EOQ Total Cost")]
    pub eoq_total_cost: f64,
    #[serde(rename = "For Shortage Amount Total Cost")]
    pub shortage_total_cost: f64,
}
