//! # Medstock CLI (`medstock`)
//!
//! ## Usage
//!
//! ```bash
//! medstock --config ./config/medstock.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medstock check [FILE]` | Load a dataset and report columns, rows and warnings |
//! | `medstock search [QUERY]` | Search the dataset |
//! | `medstock stats` | Expiry and price overview |
//! | `medstock update FILE` | Replace the stored dataset (admin password required) |
//! | `medstock serve` | Start the HTTP API |
//!
//! `check`, `search` and `stats` also work without a config file when a
//! dataset file is given directly.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use medstock::config::{self, Config};
use medstock::{check, logging, search, server, stats, update};

/// Medstock: search a pharmacy stock export.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/medstock.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "medstock",
    about = "Search a pharmacy stock export from the command line or over HTTP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/medstock.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset file and report how it was read.
    ///
    /// Prints the column matched for every field, the row count, the report
    /// date and every cell warning. Fails when a required column is missing.
    Check {
        /// Dataset file (defaults to `[dataset] path`).
        file: Option<PathBuf>,
    },

    /// Search the dataset.
    ///
    /// Case-insensitive substring match against name, code, trade name and
    /// lot number. An empty query lists every row.
    Search {
        /// The search text.
        #[arg(default_value = "")]
        query: String,

        /// Maximum number of results to print (defaults to `[display] limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Dataset file (defaults to `[dataset] path`).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show dataset statistics.
    Stats {
        /// Dataset file (defaults to `[dataset] path`).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Replace the stored dataset with FILE.
    ///
    /// The file must load with every required column. Prints `created`,
    /// `updated` or `unchanged`.
    Update {
        /// New dataset file.
        file: PathBuf,

        /// Admin password, compared with `[admin] password`.
        #[arg(long, env = "MEDSTOCK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Start the HTTP server.
    Serve,
}

/// Load the config file, or fall back to defaults for a dataset given on
/// the command line when no config file exists.
fn resolve_config(path: &Path, file: Option<&Path>) -> Result<Config> {
    match file {
        Some(file) if !path.exists() => Ok(Config::for_dataset(file)),
        _ => config::load_config(path),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Check { file } => {
            let cfg = resolve_config(&cli.config, file.as_deref())?;
            check::run_check(&cfg, file.as_deref())?;
        }
        Commands::Search {
            query,
            limit,
            json,
            file,
        } => {
            let cfg = resolve_config(&cli.config, file.as_deref())?;
            search::run_search(&cfg, &query, limit, json, file.as_deref())?;
        }
        Commands::Stats { file } => {
            let cfg = resolve_config(&cli.config, file.as_deref())?;
            stats::run_stats(&cfg, file.as_deref())?;
        }
        Commands::Update { file, password } => {
            let cfg = config::load_config(&cli.config)?;
            update::run_update(&cfg, &file, &password)?;
        }
        Commands::Serve => {
            let cfg = config::load_config(&cli.config)?;
            server::run_server(cfg).await?;
        }
    }

    Ok(())
}
