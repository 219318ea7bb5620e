//! Versioned dataset snapshots.
//!
//! A [`Snapshot`] is an immutable, fully normalized dataset. The
//! [`SnapshotStore`] holds the current one behind an `RwLock<Option<Arc<_>>>`:
//! readers clone the `Arc` and release the lock immediately; a reload builds
//! the next snapshot completely and then swaps it in. Nothing is merged and
//! nothing is mutated in place.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use medstock_core::models::Dataset;

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// 1 for the first dataset loaded by this store, +1 per replacement.
    pub version: u64,
    pub dataset: Dataset,
    /// SHA-256 (hex) of the raw file bytes.
    pub fingerprint: String,
    /// Where the bytes came from: a file path or `"upload"`.
    pub source: String,
    pub loaded_at: DateTime<Utc>,
}

/// Holder of the current snapshot, shared across server handlers.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, or `None` when no data has been loaded yet.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install `dataset` as the next version and return it.
    pub fn replace(
        &self,
        dataset: Dataset,
        fingerprint: String,
        source: impl Into<String>,
    ) -> Arc<Snapshot> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let version = guard.as_ref().map(|s| s.version + 1).unwrap_or(1);
        let snapshot = Arc::new(Snapshot {
            version,
            dataset,
            fingerprint,
            source: source.into(),
            loaded_at: Utc::now(),
        });
        *guard = Some(snapshot.clone());
        snapshot
    }
}
