//! Logging system initialization
//!
//! Logs go to `app.log` in the Nymgraph data directory. Each startup moves
//! the previous session's log to `app.log.1`, shifting older ones up to
//! `app.log.9`.

use crate::error::{NymgraphError, Result, StringError};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Number of previous sessions kept (app.log.1 through app.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Name of the current session's log file
pub const LOG_FILE_NAME: &str = "app.log";

/// Initialize the logging system, writing to `log_dir/app.log`
///
/// Log level defaults to INFO and can be overridden through `RUST_LOG`.
pub fn init_logging(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;
    rotate_logs_on_startup(&log_dir.join(LOG_FILE_NAME))?;

    // Rotation happens once per startup above, never while running
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| NymgraphError::ConfigError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NymgraphError::ConfigError(Box::new(e)))?;

    tracing::info!(
        "Nymgraph v{} started, logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );

    Ok(())
}

/// Path of the `n`th previous log next to `log_path`
fn rotated_path(log_path: &Path, n: u8) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift `app.log` to `app.log.1`, `app.log.1` to `app.log.2` and so on,
/// dropping `app.log.9`
///
/// Runs on every startup regardless of size, so each session ends up in its
/// own file.
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }
    if log_path.file_name().is_none() {
        return Err(NymgraphError::ConfigError(StringError::new(
            "Invalid log path",
        )));
    }

    let oldest = rotated_path(log_path, MAX_LOG_FILES);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            std::fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }

    std::fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(())
}
