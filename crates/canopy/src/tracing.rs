use color_eyre::Result;
use color_eyre::eyre::Context;
use std::fs::{self, File};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Initialize the tracing subscriber to log to `log_file` in `log_dir`.
///
/// The returned [`WorkerGuard`] must be kept alive for the duration of the program so
/// that buffered log lines are flushed on shutdown. Writes are non-blocking. The
/// [`ErrorLayer`] lets `color-eyre` reports capture the active span trace.
pub fn init_tracing(log_dir: &Path, log_file: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let file = File::create(log_dir.join(log_file))
        .wrap_err_with(|| format!("failed to create {log_file}"))?;
    let (non_blocking, guard) = non_blocking(file);

    // DEBUG and above by default; `RUST_LOG` overrides.
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::DEBUG.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .try_init()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(guard)
}
