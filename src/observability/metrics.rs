//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are recorded at all.
    pub enabled: bool,
    /// Address of the scrape listener.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let enabled = settings.and_then(|s| s.enabled).unwrap_or(false);
        let port = settings.and_then(|s| s.port).unwrap_or(9090);

        let mut config = Self {
            enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        };

        if let Some(enabled) = parse_bool_env("NEWSROOM_METRICS_ENABLED") {
            config.enabled = enabled;
        }
        if let Some(port) = parse_port_env("NEWSROOM_METRICS_PORT") {
            config.listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        }
        config
    }
}

/// Installs the global Prometheus recorder.
///
/// With `expose` set, a scrape listener is spawned on the current tokio
/// runtime. Returns `None` when metrics are disabled.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a recorder is already installed or
/// the listener cannot be built.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    if !expose {
        return builder
            .install_recorder()
            .map(Some)
            .map_err(|e| Error::failed("metrics_recorder_install", e));
    }

    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| Error::failed("metrics_exporter_build", e))?;
    let (recorder, exporter) = {
        let _guard = runtime.enter();
        builder
            .with_http_listener(config.listen_addr)
            .build()
            .map_err(|e| Error::failed("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| Error::failed("metrics_recorder_install", e))?;
    runtime.spawn(exporter);
    tracing::info!(addr = %config.listen_addr, "metrics listener started");
    Ok(Some(handle))
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        let value = value.to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}

fn parse_port_env(key: &str) -> Option<u16> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
}
