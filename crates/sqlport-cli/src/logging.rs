//! Logging setup for the sqlport binary
//!
//! Console output goes to stderr so dumps and query results written to stdout
//! stay clean. A JSON file layer can be enabled for bug reports.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are written
    pub log_dir: PathBuf,

    /// Write JSON logs to a daily rolling file
    pub enable_json_logs: bool,

    pub enable_console_logs: bool,

    /// Include file/line information in console logs
    pub include_location: bool,

    /// Log span open/close events
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,sqlport=info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Quiet console, JSON file for bug reports
    pub fn production() -> Self {
        Self {
            enable_json_logs: true,
            default_filter: "warn,sqlport=info,sqlport_dump=info".to_string(),
            ..Self::default()
        }
    }

    /// Verbose console output with locations and spans
    pub fn development() -> Self {
        Self {
            include_location: true,
            enable_spans: true,
            default_filter: "info,sqlport=debug,sqlport_core=debug,sqlport_schema=debug,sqlport_dump=debug,sqlport_services=debug,sqlport_driver_sqlite=debug".to_string(),
            ..Self::default()
        }
    }

    /// Configuration for a CLI run; `verbosity` counts `-v` flags
    pub fn for_verbosity(verbosity: u8, json_logs: bool) -> Self {
        let mut config = match verbosity {
            0 => Self::default(),
            1 => Self {
                default_filter: "info,sqlport_dump=debug".to_string(),
                ..Self::default()
            },
            _ => Self::development(),
        };
        config.enable_json_logs = json_logs;
        config
    }
}

/// Initialize the logging system.
///
/// The returned guard flushes the JSON file writer when dropped; keep it alive
/// until the program exits.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured filter
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
    };

    // NEW fires once when the span is created; ENTER would fire on every re-poll
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_filter(env_filter())
            .boxed();
        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "sqlport.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter())
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "Logging system initialized"
    );
    Ok(guard)
}

/// Directory for JSON log files
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlport")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::for_verbosity(0, false).default_filter, "warn,sqlport=info");
        assert!(LoggingConfig::for_verbosity(1, false).default_filter.contains("sqlport_dump=debug"));
        let loud = LoggingConfig::for_verbosity(3, true);
        assert!(loud.enable_spans);
        assert!(loud.enable_json_logs);
    }

    #[test]
    fn test_log_directory_is_namespaced() {
        assert!(log_directory().ends_with("sqlport/logs"));
    }
}
