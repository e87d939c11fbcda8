//! Service layer: data access in front of the store, and the forecast
//! orchestrator built on it.

pub mod data_access;
pub mod forecasting;
