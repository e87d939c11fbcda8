/*!
 * # Forecasting math
 *
 * Pure numeric models used by the forecasting service.
 */

/// Exponential smoothing and EOQ / total-cost formulas
pub mod forecasting;
