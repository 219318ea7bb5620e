//! `medstock check`: load a dataset file and report how it was read.
//!
//! Prints the resolved column for every logical field, the row count, the
//! report date and every cell warning. A file that lacks a required column
//! fails the command.

use std::path::Path;

use anyhow::{bail, Result};
use medstock_core::aliases::LogicalField;
use medstock_core::normalize::FIELD_DEFAULTS;

use crate::config::Config;
use crate::format::{format_count, format_expiry};
use crate::load;

pub fn run_check(config: &Config, file: Option<&Path>) -> Result<()> {
    let path = file.unwrap_or(&config.dataset.path);
    let loaded = match load::load_file(path, config)? {
        Some(loaded) => loaded,
        None => bail!("No data available: {} not found", path.display()),
    };
    let dataset = &loaded.dataset;

    println!("File:         {}", path.display());
    println!("Fingerprint:  {}", loaded.fingerprint);
    println!("Rows:         {}", format_count(dataset.len()));
    println!(
        "Report date:  {}",
        format_expiry(dataset.report_date, &config.display.date_format)
    );
    println!();
    println!("Columns:");
    for (field, column) in dataset.columns.iter() {
        match column {
            Some(col) => println!(
                "  {:<11} <- {:?} (column {})",
                field.as_str(),
                col.header,
                col.index + 1
            ),
            None => println!("  {:<11} <- (absent, {})", field.as_str(), fallback(field)),
        }
    }
    println!();

    if dataset.warnings.is_empty() {
        println!("Warnings: none");
    } else {
        println!("Warnings: {}", format_count(dataset.warnings.len()));
        for warning in &dataset.warnings {
            println!("  {}", warning);
        }
    }

    Ok(())
}

fn fallback(field: LogicalField) -> String {
    match field {
        LogicalField::Price => "defaults to 0".to_string(),
        LogicalField::Expiry => "no expiry".to_string(),
        LogicalField::ReportDate => "no report date".to_string(),
        _ => {
            let text = FIELD_DEFAULTS
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, d)| *d)
                .unwrap_or("");
            format!("defaults to {:?}", text)
        }
    }
}
