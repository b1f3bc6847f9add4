use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigError, LogSettings};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
///
/// When logging to a file the returned guard flushes the background writer
/// on drop, so it has to live as long as the program.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level).map_err(|e| ConfigError::Log(e.to_string()))?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    match settings.file {
        Some(ref path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            registry
                .with(fmt::layer().with_timer(ChronoLocal::rfc_3339()).with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| ConfigError::Log(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            registry
                .with(fmt::layer().with_timer(ChronoLocal::rfc_3339()).with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| ConfigError::Log(e.to_string()))?;
            Ok(None)
        }
    }
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, ConfigError> {
    let name = match path.file_name() {
        Some(name) => name,
        None => return Err(ConfigError::Log(format!("log file {} has no file name", path.display()))),
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(dir)
        .map_err(|e| ConfigError::Log(e.to_string()))
}
