//! TOML configuration.
//!
//! ```toml
//! [dataset]
//! path = "./data/inventory.xlsx"
//! sheet = 1
//! day_first = true
//!
//! [columns]              # optional, per-field header alias overrides
//! amount = ["Amount1", "On Hand"]
//!
//! [display]
//! limit = 100
//! date_format = "%d/%m/%Y"
//! expiring_days = 90
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! max_upload_bytes = 20971520
//!
//! [admin]
//! password = "change-me"  # leave out to disable dataset updates
//! ```

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use medstock_core::aliases::ColumnAliases;
use medstock_core::normalize::NormalizeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::format::render_date;
use crate::workbook::ReadOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub columns: ColumnAliases,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// 1-based worksheet number for xlsx files.
    #[serde(default = "default_sheet")]
    pub sheet: usize,
    #[serde(default = "default_day_first")]
    pub day_first: bool,
}

fn default_sheet() -> usize {
    1
}
fn default_day_first() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_expiring_days")]
    pub expiring_days: i64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            date_format: default_date_format(),
            expiring_days: default_expiring_days(),
        }
    }
}

fn default_limit() -> usize {
    100
}
fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}
fn default_expiring_days() -> i64 {
    90
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Shared password for dataset updates. `None` disables updates.
    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Configuration pointing at `path` with every other setting defaulted.
    pub fn for_dataset(path: impl Into<PathBuf>) -> Self {
        Self {
            dataset: DatasetConfig {
                path: path.into(),
                sheet: default_sheet(),
                day_first: default_day_first(),
            },
            columns: ColumnAliases::default(),
            display: DisplayConfig::default(),
            server: ServerConfig::default(),
            admin: AdminConfig::default(),
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            aliases: self.columns.clone(),
            day_first: self.dataset.day_first,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            sheet: self.dataset.sheet,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| "Failed to parse config file")
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;

    if config.dataset.sheet == 0 {
        anyhow::bail!("dataset.sheet must be >= 1");
    }

    if config.display.limit == 0 {
        anyhow::bail!("display.limit must be >= 1");
    }

    if config.display.expiring_days < 0 {
        anyhow::bail!("display.expiring_days must be >= 0");
    }

    let bad_pattern =
        StrftimeItems::new(&config.display.date_format).any(|item| matches!(item, Item::Error));
    let probe = NaiveDate::from_ymd_opt(2000, 1, 31).and_then(|d| render_date(d, &config.display.date_format));
    if bad_pattern || probe.is_none() {
        anyhow::bail!(
            "display.date_format is not a valid strftime pattern: '{}'",
            config.display.date_format
        );
    }

    let empty = config.columns.empty_fields();
    if !empty.is_empty() {
        let names: Vec<&str> = empty.iter().map(|f| f.as_str()).collect();
        anyhow::bail!(
            "columns: alias list must not be empty for: {}",
            names.join(", ")
        );
    }

    if let Some(pw) = &config.admin.password {
        if pw.is_empty() {
            anyhow::bail!("admin.password must not be empty (omit it to disable updates)");
        }
    }

    Ok(config)
}
