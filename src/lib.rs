//! # Medstock
//!
//! Load a pharmacy stock export (xlsx or CSV), normalize it into uniform
//! inventory records, and search it from the command line or over HTTP.
//!
//! Header names in exports vary between systems, so every logical field is
//! matched through an ordered alias list. Cells that cannot be parsed never
//! abort a load: they take a default value and are reported as warnings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  workbook   │──▶│ medstock-core│──▶│  snapshot    │
//! │ xlsx / CSV  │   │  normalize   │   │  store (Arc) │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                     ┌──────────┐      ┌──────────┐
//!                     │   CLI    │      │   HTTP   │
//!                     │(medstock)│      │  (axum)  │
//!                     └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! medstock check ./data/inventory.xlsx     # how the file was read
//! medstock search "amoxy"                  # search the configured dataset
//! medstock stats                           # expiry and price overview
//! medstock update new.xlsx --password ...  # replace the stored dataset
//! medstock serve                           # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`workbook`] | xlsx/CSV bytes to a raw table |
//! | [`load`] | Decode, normalize and fingerprint a dataset file |
//! | [`snapshot`] | Versioned, immutable dataset snapshots |
//! | [`format`] | Price, date and card rendering |
//! | [`check`] | `medstock check` |
//! | [`search`] | Filtering and `medstock search` |
//! | [`stats`] | Dataset statistics |
//! | [`update`] | Password-gated dataset replacement |
//! | [`server`] | JSON HTTP API |
//! | [`logging`] | `tracing` subscriber setup |

pub mod check;
pub mod config;
pub mod format;
pub mod load;
pub mod logging;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod stats;
pub mod update;
pub mod workbook;
