use std::path::Path;

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_DIRECTORY_NAME: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "feira.log";
const DEFAULT_LOG_FILTER: &str = "info";

/// Logs go to stderr and to a daily rolling file inside `<root>/logs`.
/// `RUST_LOG` overrides the default `info` filter.
/// Keep the returned guard alive until exit, dropping it flushes the file writer.
pub fn install_tracing(root: &Path) -> Result<WorkerGuard> {
    let log_dir = root.join(LOG_DIRECTORY_NAME);
    std::fs::create_dir_all(&log_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .into_diagnostic()
        .wrap_err("failed to build log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .into_diagnostic()
        .wrap_err("failed to install tracing subscriber")?;

    tracing::info!(?log_dir, "tracing installed");
    Ok(guard)
}
