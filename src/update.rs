//! Gated replacement of the stored dataset file.
//!
//! An update is accepted only when `[admin] password` is configured and the
//! caller supplies the same value. The new bytes must decode into a dataset
//! with every required column before anything is written; the stored file
//! is then replaced through a sibling temp file and a rename, so readers of
//! the path never see a partial write.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use medstock_core::normalize::MissingColumnError;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::load::{self, LoadError, Loaded};
use crate::workbook::ReadError;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("dataset updates are disabled: no admin password is configured")]
    Disabled,
    #[error("incorrect admin password")]
    Forbidden,
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Missing(#[from] MissingColumnError),
    #[error("failed to store dataset at {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LoadError> for UpdateError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Read(e) => UpdateError::Read(e),
            LoadError::Missing(e) => UpdateError::Missing(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// No dataset file existed before.
    Created,
    /// The stored file was replaced with different content.
    Updated,
    /// The new bytes are identical to the stored file; nothing was written.
    Unchanged,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Created => "created",
            UpdateOutcome::Updated => "updated",
            UpdateOutcome::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug)]
pub struct Applied {
    pub outcome: UpdateOutcome,
    pub loaded: Loaded,
}

/// Check the password, validate `bytes`, and store them as the dataset file.
pub fn apply_update(config: &Config, bytes: &[u8], password: &str) -> Result<Applied, UpdateError> {
    match config.admin.password.as_deref() {
        None => return Err(UpdateError::Disabled),
        Some(expected) if expected != password => return Err(UpdateError::Forbidden),
        Some(_) => {}
    }

    let loaded = load::decode(bytes, config)?;
    let target = &config.dataset.path;

    let previous = match std::fs::read(target) {
        Ok(existing) => Some(load::fingerprint(&existing)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(UpdateError::Io {
                path: target.clone(),
                source,
            })
        }
    };

    let outcome = match previous {
        Some(fp) if fp == loaded.fingerprint => UpdateOutcome::Unchanged,
        Some(_) => UpdateOutcome::Updated,
        None => UpdateOutcome::Created,
    };

    if outcome != UpdateOutcome::Unchanged {
        write_atomic(target, bytes).map_err(|source| UpdateError::Io {
            path: target.clone(),
            source,
        })?;
    }

    tracing::info!(
        path = %target.display(),
        outcome = outcome.as_str(),
        rows = loaded.dataset.len(),
        "dataset update applied"
    );

    Ok(Applied { outcome, loaded })
}

fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let tmp = temp_path(&dir, target);

    let result = (|| {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, target)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Sibling temp file for `target`, unique per call across processes and hosts.
fn temp_path(dir: &Path, target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()))
}

/// Run the update command: read `file` and apply it as the new dataset.
pub fn run_update(config: &Config, file: &Path, password: &str) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read upload file: {}", file.display()))?;
    let applied = apply_update(config, &bytes, password)
        .with_context(|| format!("Update rejected: {}", file.display()))?;

    load::log_dataset(&applied.loaded, &file.display().to_string());
    println!(
        "{}: {} ({} rows, {} warnings)",
        applied.outcome.as_str(),
        config.dataset.path.display(),
        applied.loaded.dataset.len(),
        applied.loaded.dataset.warnings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1: &str = "CODE1,NAME1,Amount1,minofLotPack\n1,Zinc,2,10\n";
    const V2: &str = "CODE1,NAME1,Amount1,minofLotPack\n1,Zinc,2,10\n2,Iron,1,30\n";

    fn config(dir: &Path, password: Option<&str>) -> Config {
        let mut cfg = Config::for_dataset(dir.join("data").join("stock.csv"));
        cfg.admin.password = password.map(str::to_string);
        cfg
    }

    #[test]
    fn disabled_without_password() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), None);
        let err = apply_update(&cfg, V1.as_bytes(), "anything").unwrap_err();
        assert!(matches!(err, UpdateError::Disabled));
        assert!(!cfg.dataset.path.exists());
    }

    #[test]
    fn wrong_password_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("secret"));
        let err = apply_update(&cfg, V1.as_bytes(), "guess").unwrap_err();
        assert!(matches!(err, UpdateError::Forbidden));
        assert!(!cfg.dataset.path.exists());
    }

    #[test]
    fn created_updated_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("secret"));

        let first = apply_update(&cfg, V1.as_bytes(), "secret").unwrap();
        assert_eq!(first.outcome, UpdateOutcome::Created);
        assert_eq!(std::fs::read_to_string(&cfg.dataset.path).unwrap(), V1);

        let again = apply_update(&cfg, V1.as_bytes(), "secret").unwrap();
        assert_eq!(again.outcome, UpdateOutcome::Unchanged);

        let second = apply_update(&cfg, V2.as_bytes(), "secret").unwrap();
        assert_eq!(second.outcome, UpdateOutcome::Updated);
        assert_eq!(second.loaded.dataset.len(), 2);
        assert_eq!(std::fs::read_to_string(&cfg.dataset.path).unwrap(), V2);

        let leftovers: Vec<_> = std::fs::read_dir(cfg.dataset.path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn temp_paths_are_unique_siblings() {
        let dir = Path::new("/data");
        let target = dir.join("stock.xlsx");
        let a = temp_path(dir, &target);
        let b = temp_path(dir, &target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(dir));
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".stock.xlsx.") && name.ends_with(".tmp"), "{}", name);
    }

    #[test]
    fn invalid_upload_leaves_stored_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("secret"));
        apply_update(&cfg, V1.as_bytes(), "secret").unwrap();

        let err = apply_update(&cfg, b"CODE1,NAME1\n1,Zinc\n", "secret").unwrap_err();
        match err {
            UpdateError::Missing(m) => assert_eq!(m.names(), vec!["amount", "pack_size"]),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(std::fs::read_to_string(&cfg.dataset.path).unwrap(), V1);
    }
}
