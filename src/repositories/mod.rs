pub mod historical_store;

pub use historical_store::{HistoricalStore, SeaOrmHistoricalStore};
