//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{FleetError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber.
///
/// RUST_LOG wins over `config.level`. When `config.dir` is set and writable
/// a daily rolling file layer is added next to the console layer.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| FleetError::Logging(e.to_string()))?;

    let file_layer = config.dir.as_deref().and_then(file_layer);

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| FleetError::Logging(e.to_string()))
}

fn file_layer<S>(log_dir: &str) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    // `rolling::daily` panics if the first file can't be created, so probe first.
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: Could not create log directory {log_dir} ({e}), file logging disabled");
        return None;
    }
    let probe = std::path::Path::new(log_dir).join(".fleet_write_test");
    if let Err(e) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        eprintln!("Warning: Could not write to log directory {log_dir} ({e}), file logging disabled");
        return None;
    }
    let _ = std::fs::remove_file(&probe);

    let file_appender = tracing_appender::rolling::daily(log_dir, "fleet-broadcast.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the guard for the life of the process
    Box::leak(Box::new(guard));

    Some(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed(),
    )
}
