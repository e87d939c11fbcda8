//! Seed script - provisions a demand table and fills it with history
//!
//! Run with: cargo run --bin seed-data -- --table sales_data --values 10,20,30
//!
//! Without `--values` a seasonal series of `--months` observations around
//! `--base` is generated.

use anyhow::{bail, Context};
use clap::Parser;
use std::f64::consts::PI;
use tracing::info;

use demand_forecast_api::{
    config::load_config,
    db::{close_pool, establish_connection},
    repositories::historical_store::{create_demand_table, insert_demand, reset_demand_table},
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Create and fill a demand table")]
struct Args {
    /// Demand table to create or extend
    #[arg(long, default_value = "sales_data")]
    table: String,

    /// Explicit comma separated observations, oldest first
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["months", "base"])]
    values: Option<Vec<f64>>,

    /// Number of monthly observations to generate
    #[arg(long, default_value_t = 24)]
    months: usize,

    /// Average monthly demand of the generated series
    #[arg(long, default_value_t = 120.0)]
    base: f64,

    /// Recreate the table before inserting so row ids restart at 1
    #[arg(long)]
    reset: bool,

    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,
}

/// Seasonal demand with a mild upward trend, peaking mid-year.
fn seasonal_series(months: usize, base: f64) -> Vec<f64> {
    (0..months)
        .map(|m| {
            let season = (2.0 * PI * (m % 12) as f64 / 12.0).sin() * 0.25;
            let trend = 1.0 + m as f64 * 0.01;
            (base * trend * (1.0 + season)).round()
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let values = match args.values {
        Some(values) => values,
        None => seasonal_series(args.months, args.base),
    };
    if values.is_empty() {
        bail!("nothing to insert: provide --values or a positive --months");
    }

    let database_url = match args.database_url {
        Some(url) => url,
        None => load_config().context("failed to load configuration")?.database_url,
    };

    info!("Connecting to database: {}", database_url);
    let db = establish_connection(&database_url).await?;

    if args.reset {
        reset_demand_table(&db, &args.table)
            .await
            .with_context(|| format!("failed to reset table {}", args.table))?;
        info!("Recreated table {}", args.table);
    } else {
        create_demand_table(&db, &args.table)
            .await
            .with_context(|| format!("failed to create table {}", args.table))?;
    }

    let inserted = insert_demand(&db, &args.table, &values).await?;
    info!("Inserted {} observations into {}", inserted, args.table);

    close_pool(db).await?;

    info!("Try these API calls:");
    info!("  curl 'http://localhost:8080/forecast?table={}'", args.table);
    info!("  curl 'http://localhost:8080/EOQ?table={}'", args.table);
    info!("  curl 'http://localhost:8080/cost?table={}'", args.table);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasonal_series_has_requested_length() {
        let series = seasonal_series(24, 100.0);
        assert_eq!(series.len(), 24);
        assert_eq!(series[0], 100.0);
        assert!(series.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn explicit_values_are_comma_separated() {
        let args = Args::parse_from(["seed-data", "--table", "t", "--values", "10,20.5,30"]);
        assert_eq!(args.values, Some(vec![10.0, 20.5, 30.0]));
        assert!(!args.reset);
    }

    #[test]
    fn reset_flag_is_parsed() {
        let args = Args::parse_from(["seed-data", "--reset", "--months", "6"]);
        assert!(args.reset);
        assert_eq!(args.months, 6);
        assert_eq!(args.values, None);
    }
}
