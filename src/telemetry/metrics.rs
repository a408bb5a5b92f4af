//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with its own scrape listener on `addr`.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<()> {
    // Permission checks are dominated by cache hits; directory misses reach seconds
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install()
        .context("failed to install Prometheus exporter")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    // Decisions
    describe_counter!(
        "opsgate_permission_checks_total",
        "Permission checks by decision and reason"
    );
    describe_histogram!(
        "opsgate_permission_check_duration_seconds",
        "Permission check duration in seconds, including directory calls"
    );

    // Caches and directory
    describe_counter!(
        "opsgate_cache_lookups_total",
        "Resolver cache lookups by cache and result (hit/miss)"
    );
    describe_counter!(
        "opsgate_directory_errors_total",
        "Directory calls that failed or timed out, by call and error kind"
    );

    // Notifications
    describe_counter!(
        "opsgate_denial_notifications_total",
        "Denied-access alerts by delivery result"
    );

    counter!("opsgate_permission_checks_total", "decision" => "deny", "reason" => "Unknown operation")
        .increment(0);
    counter!("opsgate_cache_lookups_total", "cache" => "handle_to_id", "result" => "hit").increment(0);
    counter!("opsgate_denial_notifications_total", "result" => "sent").increment(0);
    histogram!("opsgate_permission_check_duration_seconds").record(0.0);
}
