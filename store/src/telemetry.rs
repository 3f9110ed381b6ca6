//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

const DEFAULT_LOG_PREFIX: &str = "territorio.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. With `debug.log_to_file` set,
/// events go to a daily rolling file next to the configured log file and the
/// returned guard must be kept alive to flush it. Otherwise they go to stderr.
pub fn init(config: &AppConfig) -> std::io::Result<Option<WorkerGuard>> {
    let level = if config.debug.enabled {
        "debug".to_string()
    } else {
        config.debug.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = if config.debug.log_to_file {
        let log_file = config.log_file();
        let log_dir = log_file.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(log_dir)?;
        let prefix = log_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_LOG_PREFIX.to_string());
        let appender = tracing_appender::rolling::daily(log_dir, prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_writer(std::io::stderr));

    if tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::load(dir.path()).unwrap();
        config.debug.log_file = "nested/logs/app.log".into();

        let guard = init(&config).unwrap();
        assert!(guard.is_some());
        assert!(dir.path().join("nested/logs").is_dir());

        // A second call must not panic.
        config.debug.log_to_file = false;
        assert!(init(&config).unwrap().is_none());
    }
}
