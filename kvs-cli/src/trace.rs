//! Structured, leveled logging for the binaries. Library crates speak only
//! through the `tracing` facade (never install a subscriber themselves); this
//! is where a subscriber actually gets installed for the process -- a
//! rolling daily file sink via `tracing-appender`, plus a stderr layer,
//! combined through `tracing-subscriber`'s `EnvFilter`. Generalizes
//! `kv-cli::trace::init_logging`, which wires the same `tracing-appender`
//! rolling sink through `fern`/`log` instead -- `fern` is dropped here since
//! nothing downstream emits through the `log` facade.

use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const MAX_LOG_FILES: usize = 10;

pub fn init_logging(dir: &str, level: &str) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("kvs.log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(rolling);

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file_writer.and(std::io::stderr))
        .with_ansi(false)
        .init();

    Ok(guard)
}
