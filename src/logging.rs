//! Structured logging setup.
//!
//! Logs go to **stderr** so stdout stays parseable (`medstock search --json`).
//! The filter honours `RUST_LOG`; without it, this crate logs at `info`
//! and everything else at `warn`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "medstock=debug,medstock_core=debug,warn"
    } else {
        "medstock=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
