use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

pub const LOG_FILE_PREFIX: &str = "device-console.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Routes tracing output to a daily rolling file under `dir`. The terminal
/// belongs to the UI, so nothing is written to stdout/stderr.
pub fn init_file_logging(dir: &Path, filter: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("failed to create log directory {}", dir.display()))?;
    let filter = EnvFilter::try_new(filter)
        .wrap_err_with(|| format!("invalid log filter {filter:?}"))?;
    let appender = rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| eyre!("{e}"))
        .wrap_err("failed to install tracing subscriber")?;
    let _ = LOG_GUARD.set(guard);
    Ok(())
}
