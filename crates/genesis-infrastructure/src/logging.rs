//! Tracing bootstrap.

use genesis_core::GenesisError;
use genesis_core::config::LoggingConfig;
use genesis_core::error::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. When `config.file` is
/// set, output goes to a daily rolling file instead of stderr and the
/// returned guard must be kept alive until exit to flush it.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| GenesisError::config(format!("invalid log filter '{}': {e}", config.level)))?;

    let (writer, guard) = match &config.file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .ok_or_else(|| GenesisError::config(format!("log file '{}' has no file name", path.display())))?;
            let appender = tracing_appender::rolling::daily(directory.unwrap_or_else(|| ".".as_ref()), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = config.file.is_none();

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer).with_ansi(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            )
            .try_init()
    };
    installed.map_err(|e| GenesisError::internal(format!("tracing already initialized: {e}")))?;

    tracing::debug!(level = %config.level, json = config.json, "[Logging] initialized");
    Ok(guard)
}
