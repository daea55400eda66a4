//! Logging bootstrap for OpsDesk services
//!
//! Console output is always enabled; file output is optional and uses a
//! daily-rolling non-blocking writer. `RUST_LOG` overrides the configured
//! level when set.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the log file stem
    pub service_name: String,
    /// Default filter directive when RUST_LOG is unset (e.g. "info")
    pub level: String,
    /// Directory for log files; None disables file output
    pub log_dir: Option<PathBuf>,
    /// Emit JSON-formatted file logs instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "opsdesk".to_string(),
            level: "info".to_string(),
            log_dir: None,
            json: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns the file writer guard, which the caller must keep alive for the
/// process lifetime so buffered log lines are flushed on shutdown.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = fmt::layer().with_ansi(true).boxed();

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let layer = if config.json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .boxed()
            } else {
                fmt::layer().with_writer(non_blocking).with_ansi(false).boxed()
            };
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::info!(
        "Logging initialized: {} (file output: {})",
        config.service_name,
        config.log_dir.is_some()
    );

    Ok(guard)
}
