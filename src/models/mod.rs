pub mod series;

pub use series::{CostResult, EoqResult, ForecastPoint, RawValue};
