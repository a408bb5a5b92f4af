//! Telemetry initialization: metrics and structured logging

pub mod metrics;

use crate::config::TelemetryConfig;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise logging and, when enabled, the Prometheus exporter.
///
/// Returns the address the scrape endpoint listens on, if any.
pub fn init(config: &TelemetryConfig) -> Result<Option<SocketAddr>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "opsgate_core=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_format == "json" {
        // Keep `message` and event fields at the top level of each record
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true);
        registry.with(fmt_layer).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if !config.metrics_enabled {
        return Ok(None);
    }

    let addr: SocketAddr = config
        .metrics_addr
        .parse()
        .with_context(|| format!("Invalid METRICS_ADDR: {}", config.metrics_addr))?;
    metrics::install_prometheus_exporter(addr)?;
    metrics::describe_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");

    Ok(Some(addr))
}
