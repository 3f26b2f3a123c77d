//! Tracing setup: stderr plus an append-only log file.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from `[log].level`.
//! The file layer writes through a non-blocking worker; the returned guard
//! must live until the process exits or buffered lines are lost.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create log directory: {}", config.dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&config.dir, &config.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: '{}'", config.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        path = %config.dir.join(&config.file).display(),
        "file logging enabled"
    );
    Ok(guard)
}
