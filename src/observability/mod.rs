//! Observability: structured logging and Prometheus metrics.

mod logging;
mod metrics;

pub use self::logging::{DEFAULT_FILTER, LogFormat, LoggingConfig};
pub use self::metrics::{MetricsConfig, install_prometheus};

use crate::config::NewsroomConfig;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Full observability configuration.
#[derive(Debug)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
    /// Whether to expose metrics via HTTP listener.
    pub metrics_expose: bool,
}

/// Options for initialization.
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
    /// Whether to expose metrics via HTTP listener.
    pub metrics_expose: bool,
}

/// Handle for observability runtime components.
#[derive(Default)]
pub struct ObservabilityHandle {
    metrics_handle: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Renders the current metrics in Prometheus text format.
    ///
    /// Returns `None` when no recorder was installed.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics_handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for ObservabilityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityHandle")
            .field("metrics", &self.metrics_handle.is_some())
            .finish()
    }
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Initializes observability from loaded configuration with env overrides.
///
/// # Errors
///
/// Returns an error if observability has already been initialized or if any
/// component fails to initialize.
pub fn init_from_config(
    config: &NewsroomConfig,
    options: InitOptions,
) -> Result<ObservabilityHandle> {
    init(ObservabilityConfig {
        logging: LoggingConfig::from_settings(Some(&config.logging), options.verbose),
        metrics: MetricsConfig::from_settings(Some(&config.metrics)),
        metrics_expose: options.metrics_expose,
    })
}

/// Initializes logging and metrics for the process.
///
/// # Errors
///
/// Returns an error if observability has already been initialized or if any
/// component fails to initialize.
pub fn init(config: ObservabilityConfig) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::failed(
            "observability_init",
            "observability already initialized",
        ));
    }

    let metrics_handle = install_prometheus(&config.metrics, config.metrics_expose)?;

    match (&config.logging.file, config.logging.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(config.logging.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (Some(log_file), LogFormat::Pretty) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(config.logging.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(config.logging.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(config.logging.filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::failed("observability_init", "failed to mark initialized"))?;

    tracing::debug!(directive = %config.logging.directive, "observability initialized");
    Ok(ObservabilityHandle { metrics_handle })
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::failed("create_log_dir", e))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::failed("open_log_file", format!("{}: {e}", path.display())))?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::failed("observability_init", e)
}
