//! Tracing subscriber setup for the terminal binary.
//!
//! The terminal is owned by ratatui, so events go to a log file instead of
//! stderr. `RUST_LOG` wins over the configured level.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::Result;

/// Install a file-backed `fmt` subscriber. Safe to call twice; the second call is a no-op.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;

    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
    Ok(())
}
