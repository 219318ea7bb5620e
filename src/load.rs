//! Dataset loading: bytes -> [`RawTable`](medstock_core::models::RawTable)
//! -> [`Dataset`], with fingerprinting and logging.
//!
//! A missing dataset file is not an error here: it is reported as `Ok(None)`
//! ("no data available") so callers can tell it apart from a dataset with
//! zero matching rows.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use medstock_core::models::Dataset;
use medstock_core::normalize::{normalize_with, MissingColumnError};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::Config;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::workbook::{read_table, ReadError};

/// Individual cell warnings logged per load before collapsing into a count.
const MAX_LOGGED_WARNINGS: usize = 20;

/// Why a file could not become a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Missing(#[from] MissingColumnError),
}

/// A decoded dataset plus the fingerprint of the bytes it came from.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub dataset: Dataset,
    pub fingerprint: String,
}

/// SHA-256 of `bytes`, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Decode and normalize raw file bytes using the configured options.
pub fn decode(bytes: &[u8], config: &Config) -> Result<Loaded, LoadError> {
    let table = read_table(bytes, &config.read_options())?;
    let dataset = normalize_with(&table, &config.normalize_options())?;
    Ok(Loaded {
        dataset,
        fingerprint: fingerprint(bytes),
    })
}

/// Load the dataset at `path`. `Ok(None)` when the file does not exist.
pub fn load_file(path: &Path, config: &Config) -> Result<Option<Loaded>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "dataset file not found; no data available");
        return Ok(None);
    }
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;
    let loaded = decode(&bytes, config)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
    log_dataset(&loaded, &path.display().to_string());
    Ok(Some(loaded))
}

/// Load the configured dataset into `store`.
pub fn load_into(store: &SnapshotStore, config: &Config) -> Result<Option<Arc<Snapshot>>> {
    let path = &config.dataset.path;
    Ok(load_file(path, config)?.map(|loaded| {
        store.replace(
            loaded.dataset,
            loaded.fingerprint,
            path.display().to_string(),
        )
    }))
}

/// Emit the load summary and cell warnings.
pub fn log_dataset(loaded: &Loaded, source: &str) {
    let dataset = &loaded.dataset;
    tracing::info!(
        source,
        rows = dataset.len(),
        warnings = dataset.warnings.len(),
        fingerprint = &loaded.fingerprint[..12],
        "dataset loaded"
    );
    for warning in dataset.warnings.iter().take(MAX_LOGGED_WARNINGS) {
        tracing::warn!("{}", warning);
    }
    if dataset.warnings.len() > MAX_LOGGED_WARNINGS {
        tracing::warn!(
            "{} more cell warnings not shown",
            dataset.warnings.len() - MAX_LOGGED_WARNINGS
        );
    }
}
