//! Logging initialization for the typelens binary.
//!
//! It supports three modes:
//! - Cli mode: logs to STDERR, keeping STDOUT for command output.
//! - Foreground mode: logs to STDERR and to a rolling file.
//! - Background mode: logs JSON lines to a rolling file only.
//!
//! File logs are rolled over when they reach 5 MB. Rotated logs are
//! compressed. The maximum number of rotated logs is 20.

use anyhow::{Result, anyhow};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

const APPLICATION_DIRECTORY: &str = "typelens";
const LOG_FILE_NAME: &str = "typelens.log";
const MAX_LOG_FILES: usize = 20;
const MAX_LOG_FILE_BYTES: usize = 5 * 1024 * 1024;

pub enum LogMode {
    Cli,
    Foreground,
    Background,
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// `<local data dir>/typelens/logs`.
pub fn default_log_directory() -> Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("could not determine the data directory"))?;
    Ok(data_dir.join(APPLICATION_DIRECTORY).join("logs"))
}

fn rotating_writer(log_dir: &Path) -> Result<FileRotate<AppendCount>> {
    std::fs::create_dir_all(log_dir)?;
    Ok(FileRotate::new(
        log_dir.join(LOG_FILE_NAME),
        AppendCount::new(MAX_LOG_FILES),
        ContentLimit::Bytes(MAX_LOG_FILE_BYTES),
        Compression::OnRotate(1),
        None,
    ))
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// `log_dir` is only used by the file-backed modes; `None` selects
/// [`default_log_directory`].
pub fn init(mode: LogMode, verbose: bool, log_dir: Option<PathBuf>) -> Result<Option<LoggingGuards>> {
    let filter = env_filter(verbose);

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
        LogMode::Foreground => {
            let log_dir = match log_dir {
                Some(dir) => dir,
                None => default_log_directory()?,
            };
            let (file_non_blocking, file_guard) =
                tracing_appender::non_blocking(rotating_writer(&log_dir)?);
            // A caller that never drains stderr must not stall the analysis;
            // excess lines are dropped.
            let (stderr_non_blocking, stderr_guard) = NonBlockingBuilder::default()
                .lossy(true)
                .buffered_lines_limit(10_000)
                .finish(std::io::stderr());

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(
                    file_non_blocking
                        .with_max_level(tracing::Level::INFO)
                        .and(stderr_non_blocking),
                )
                .with_ansi(false)
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![file_guard, stderr_guard],
            }))
        }
        LogMode::Background => {
            let log_dir = match log_dir {
                Some(dir) => dir,
                None => default_log_directory()?,
            };
            let (non_blocking, guard) = tracing_appender::non_blocking(rotating_writer(&log_dir)?);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.with_max_level(tracing::Level::INFO))
                .with_ansi(false)
                .json()
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![guard],
            }))
        }
    }
}
