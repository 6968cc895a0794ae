//! Logging setup for the `rowpipe` binary.
//!
//! The library itself only emits `tracing` events; installing a subscriber is left to
//! the application. The CLI calls [`init`] once at startup.
//!
//! ## Usage
//!
//! ```no_run
//! use rowpipe::logging;
//!
//! logging::init("info").expect("Failed to initialize logging");
//!
//! tracing::info!("Pipeline started");
//! ```

use anyhow::{Context as _, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Install a stderr subscriber filtered at `default_level`.
///
/// `RUST_LOG` takes precedence over `default_level` when set. Stdout stays free for
/// pipeline output.
///
/// # Errors
///
/// Returns error if the filter is invalid or a global subscriber is already installed
pub fn init(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized at level {}", default_level);
    Ok(())
}

