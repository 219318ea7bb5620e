//! Dataset statistics.
//!
//! A quick health overview of the loaded dataset: row count, expiry
//! breakdown, summed unit prices and the number of cell warnings. Used by
//! `medstock stats` and `GET /stats`.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use medstock_core::models::Dataset;
use serde::Serialize;

use crate::config::Config;
use crate::format::{format_count, format_expiry, format_price, ExpiryStatus};
use crate::load;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub expired: usize,
    /// Not expired, but expiring within `display.expiring_days`.
    pub expiring: usize,
    pub valid: usize,
    pub no_expiry: usize,
    /// Sum of unit prices over all rows.
    pub price_total: f64,
    pub warnings: usize,
    pub report_date: Option<NaiveDate>,
}

pub fn compute_stats(dataset: &Dataset, today: NaiveDate, expiring_days: i64) -> DatasetStats {
    let mut stats = DatasetStats {
        rows: dataset.len(),
        expired: 0,
        expiring: 0,
        valid: 0,
        no_expiry: 0,
        price_total: 0.0,
        warnings: dataset.warnings.len(),
        report_date: dataset.report_date,
    };
    for item in &dataset.items {
        match ExpiryStatus::of(item.expiry_date(), today, expiring_days) {
            ExpiryStatus::Expired => stats.expired += 1,
            ExpiryStatus::Expiring => stats.expiring += 1,
            ExpiryStatus::Valid => stats.valid += 1,
            ExpiryStatus::Unknown => stats.no_expiry += 1,
        }
        stats.price_total += item.price();
    }
    stats
}

/// Stats of a served snapshot, as returned by `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStats {
    pub version: u64,
    pub source: String,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: DatasetStats,
}

/// Run the stats command: load the dataset and print a summary.
pub fn run_stats(config: &Config, file: Option<&Path>) -> Result<()> {
    let path = file.unwrap_or(&config.dataset.path);
    let loaded = match load::load_file(path, config)? {
        Some(loaded) => loaded,
        None => {
            println!("No data available: {} not found.", path.display());
            return Ok(());
        }
    };

    let today = chrono::Local::now().date_naive();
    let stats = compute_stats(&loaded.dataset, today, config.display.expiring_days);
    let pattern = &config.display.date_format;

    println!("Medstock dataset stats");
    println!("======================");
    println!();
    println!("  File:         {}", path.display());
    println!("  Fingerprint:  {}", &loaded.fingerprint[..16]);
    println!("  Report date:  {}", format_expiry(stats.report_date, pattern));
    println!();
    println!("  Rows:         {}", format_count(stats.rows));
    println!("  Expired:      {}", format_count(stats.expired));
    println!(
        "  Expiring:     {} (within {} days)",
        format_count(stats.expiring),
        config.display.expiring_days
    );
    println!("  Valid:        {}", format_count(stats.valid));
    println!("  No expiry:    {}", format_count(stats.no_expiry));
    println!("  Price total:  {}", format_price(stats.price_total));
    println!("  Warnings:     {}", format_count(stats.warnings));
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medstock_core::models::{CellValue, RawTable};
    use medstock_core::normalize::normalize;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(code: &str, price: CellValue, exp: CellValue) -> Vec<CellValue> {
        vec![
            CellValue::Text(code.into()),
            CellValue::Text(format!("Item {}", code)),
            CellValue::Number(1.0),
            CellValue::Number(10.0),
            price,
            exp,
        ]
    }

    #[test]
    fn counts_expiry_buckets_and_prices() {
        let table = RawTable::with_rows(
            ["CODE1", "NAME1", "Amount1", "minofLotPack", "price", "ExpDate"],
            vec![
                row("1", CellValue::Number(10.0), CellValue::Date(ymd(2026, 1, 1))),
                row("2", CellValue::Number(2.5), CellValue::Date(ymd(2026, 11, 1))),
                row("3", CellValue::Text("oops".into()), CellValue::Date(ymd(2028, 1, 1))),
                row("4", CellValue::Blank, CellValue::Blank),
            ],
        );
        let dataset = normalize(&table).unwrap();
        let stats = compute_stats(&dataset, ymd(2026, 10, 18), 90);

        assert_eq!(stats.rows, 4);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.expiring, 1);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.no_expiry, 1);
        assert_eq!(stats.price_total, 12.5);
        assert_eq!(stats.warnings, 1);
    }

    #[test]
    fn empty_dataset() {
        let table = RawTable::with_rows(["CODE1", "NAME1", "Amount1", "minofLotPack"], vec![]);
        let stats = compute_stats(&normalize(&table).unwrap(), ymd(2026, 1, 1), 90);
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.price_total, 0.0);
    }
}
