use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, ColumnDef, Expr, Order, Query, SimpleExpr, Table};
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryResult};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::ServiceError;
use crate::models::series::RawValue;

/// Primary key of every demand table
pub const ID_COLUMN: &str = "id";
/// Column holding the historical observations
pub const DEMAND_COLUMN: &str = "demand";
/// Column the projected series is written back to
pub const FORECAST_COLUMN: &str = "forecasted_value";

const MAX_IDENTIFIER_LEN: usize = 64;

/// Point reads of a column and point updates of the forecast column.
#[async_trait]
pub trait HistoricalStore: Send + Sync {
    /// All values of `column` in `table`, in row-id order.
    async fn fetch_column(&self, table: &str, column: &str)
        -> Result<Vec<RawValue>, ServiceError>;

    /// Set the forecast column of the row with the given id.
    async fn update_forecast(&self, table: &str, id: i64, value: f64)
        -> Result<(), ServiceError>;
}

/// Rejects anything that is not a plain SQL identifier.
///
/// Table and column names arrive from the query string and are interpolated
/// into statements, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_identifier(kind: &str, identifier: &str) -> Result<(), ServiceError> {
    if identifier.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "{} name must not be empty",
            kind
        )));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "{} name exceeds {} characters",
            kind, MAX_IDENTIFIER_LEN
        )));
    }
    if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ServiceError::InvalidInput(format!(
            "invalid characters in {} name '{}'",
            kind, identifier
        )));
    }
    if identifier.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        return Err(ServiceError::InvalidInput(format!(
            "{} name '{}' cannot start with a number",
            kind, identifier
        )));
    }
    Ok(())
}

/// Decode the first column of a row into the tagged value form.
fn decode_value(row: &QueryResult) -> Result<RawValue, ServiceError> {
    if let Ok(v) = row.try_get_by_index::<Option<i64>>(0) {
        return Ok(v.map_or(RawValue::Null, RawValue::Integer));
    }
    if let Ok(v) = row.try_get_by_index::<Option<i32>>(0) {
        return Ok(v.map_or(RawValue::Null, |v| RawValue::Integer(i64::from(v))));
    }
    if let Ok(v) = row.try_get_by_index::<Option<i16>>(0) {
        return Ok(v.map_or(RawValue::Null, |v| RawValue::Integer(i64::from(v))));
    }
    if let Ok(v) = row.try_get_by_index::<Option<f64>>(0) {
        return Ok(v.map_or(RawValue::Null, RawValue::Float));
    }
    if let Ok(v) = row.try_get_by_index::<Option<f32>>(0) {
        return Ok(v.map_or(RawValue::Null, |v| RawValue::Float(f64::from(v))));
    }
    if let Ok(v) = row.try_get_by_index::<Option<String>>(0) {
        return Ok(v.map_or(RawValue::Null, RawValue::Text));
    }
    // DECIMAL columns keep their exact literal and are parsed on normalisation
    if let Ok(v) = row.try_get_by_index::<Option<Decimal>>(0) {
        return Ok(v.map_or(RawValue::Null, |d| RawValue::Text(d.to_string())));
    }

    Err(ServiceError::ConversionError(
        "failed to decode column value: unsupported storage type".to_string(),
    ))
}

/// Historical store backed by any sea-orm connection (MySQL, Postgres, SQLite).
#[derive(Debug, Clone)]
pub struct SeaOrmHistoricalStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmHistoricalStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoricalStore for SeaOrmHistoricalStore {
    async fn fetch_column(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<RawValue>, ServiceError> {
        validate_identifier("table", table)?;
        validate_identifier("column", column)?;

        let stmt = Query::select()
            .column(Alias::new(column))
            .from(Alias::new(table))
            .order_by(Alias::new(ID_COLUMN), Order::Asc)
            .to_owned();

        let backend = self.db.get_database_backend();
        let rows = self.db.query_all(backend.build(&stmt)).await.map_err(|e| {
            error!(table = %table, column = %column, error = %e, "Failed to query data");
            ServiceError::DatabaseError(e)
        })?;

        debug!(table = %table, column = %column, rows = rows.len(), "Fetched column");
        rows.iter().map(decode_value).collect()
    }

    async fn update_forecast(&self, table: &str, id: i64, value: f64) -> Result<(), ServiceError> {
        validate_identifier("table", table)?;

        let stmt = Query::update()
            .table(Alias::new(table))
            .value(Alias::new(FORECAST_COLUMN), value)
            .and_where(Expr::col(Alias::new(ID_COLUMN)).eq(id))
            .to_owned();

        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&stmt)).await.map_err(|e| {
            error!(table = %table, id = id, error = %e, "Failed to update forecasted value");
            ServiceError::DatabaseError(e)
        })?;
        if result.rows_affected() == 0 {
            warn!(table = %table, id = id, "No row with this id; forecasted value not stored");
        }
        Ok(())
    }
}

/// Create a demand table (`id`, `demand`, `forecasted_value`) if it is missing.
pub async fn create_demand_table(db: &DatabaseConnection, table: &str) -> Result<(), ServiceError> {
    validate_identifier("table", table)?;

    let stmt = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new(ID_COLUMN))
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(Alias::new(DEMAND_COLUMN)).double().not_null())
        .col(ColumnDef::new(Alias::new(FORECAST_COLUMN)).double().null())
        .to_owned();

    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Drop and recreate a demand table so row ids restart at 1.
///
/// Forecasts are persisted by position (`id = index + 1`), so a plain `DELETE`
/// would leave the auto-increment counter past the new rows.
pub async fn reset_demand_table(db: &DatabaseConnection, table: &str) -> Result<(), ServiceError> {
    validate_identifier("table", table)?;

    let stmt = Table::drop()
        .table(Alias::new(table))
        .if_exists()
        .to_owned();
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;

    create_demand_table(db, table).await
}

/// Append demand observations; rows receive ids in insertion order.
pub async fn insert_demand(
    db: &DatabaseConnection,
    table: &str,
    values: &[f64],
) -> Result<u64, ServiceError> {
    validate_identifier("table", table)?;
    if values.is_empty() {
        return Ok(0);
    }

    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(table))
        .columns([Alias::new(DEMAND_COLUMN)]);
    for value in values {
        stmt.values([SimpleExpr::from(*value)])
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
    }

    let backend = db.get_database_backend();
    let result = db.execute(backend.build(&stmt)).await?;
    Ok(result.rows_affected())
}
