use anyhow::{Context, Result};
use ledflow_core::LogConfig;
use std::fs::File;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer thread alive; flushes on drop
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber described by `config`.
///
/// `verbose` raises the configured level: 1 for debug, 2 or more for trace.
pub fn init(config: &LogConfig, verbose: u8) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;
    let removed = match config.cleanup_old_logs() {
        Ok(removed) => removed,
        Err(e) => {
            eprintln!("Warning: Failed to clean up old log files: {}", e);
            0
        }
    };

    let level = effective_level(config, verbose);

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_output {
        // stderr only; stdout carries command output
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter(level))
                .boxed(),
        );
    }
    let guard = if config.file_output {
        let (layer, guard) = file_layer(config, level)?;
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry().with(layers).init();

    tracing::debug!("Logging initialized at level {}", level);
    if removed > 0 {
        tracing::debug!("Removed {} old log files", removed);
    }
    Ok(guard)
}

/// Configured level, raised by `-v` flags but never lowered
fn effective_level(config: &LogConfig, verbose: u8) -> LevelFilter {
    let requested = match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    config.parse_level().max(requested)
}

/// RUST_LOG takes precedence over `level`
fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn file_layer(config: &LogConfig, level: LevelFilter) -> Result<(BoxedLayer, LogGuard)> {
    let log_path = config.current_log_path();
    let file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
    let (writer, worker_guard) = tracing_appender::non_blocking(file);
    eprintln!("Logging to file: {:?}", log_path);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(env_filter(level))
        .boxed();
    Ok((
        layer,
        LogGuard {
            _guard: worker_guard,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        let config = LogConfig::default();
        assert_eq!(effective_level(&config, 0), LevelFilter::INFO);
        assert_eq!(effective_level(&config, 1), LevelFilter::DEBUG);
        assert_eq!(effective_level(&config, 3), LevelFilter::TRACE);
    }

    #[test]
    fn test_verbose_never_lowers_level() {
        let config = LogConfig {
            level: "trace".to_string(),
            ..Default::default()
        };
        assert_eq!(effective_level(&config, 1), LevelFilter::TRACE);
    }
}
