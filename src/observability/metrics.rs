//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define pinger metrics (probe outcomes, latency, endpoint health, loss)
//! - Expose Prometheus-compatible metrics endpoint
//! - Provide the `MetricsSink` seam the probe workers write through
//!
//! # Metrics
//! - `pinger_probe_total` (counter): probes by cluster, endpoint, success
//! - `pinger_probe_latency_ms` (histogram): confirmation latency
//! - `pinger_endpoint_status` (gauge): 0=active, 1=degraded, 2=failed
//! - `pinger_loss_ratio` (gauge): loss ratio of the latest report window
//! - `pinger_retention_deleted_total` (counter): rows pruned
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without an installed recorder the macros are no-ops

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::failover::HealthStatus;
use crate::probe::PingResult;
use crate::report::ReportWindow;

/// Destination for per-probe data points.
pub trait MetricsSink: Send + Sync {
    /// Record one probe outcome.
    fn record_probe(&self, result: &PingResult);

    /// Record an aggregated report window.
    fn record_window(&self, window: &ReportWindow);
}

/// Sink backed by the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn record_probe(&self, result: &PingResult) {
        counter!(
            "pinger_probe_total",
            "cluster" => result.cluster.clone(),
            "endpoint" => result.endpoint_url.clone(),
            "success" => if result.success { "true" } else { "false" }
        )
        .increment(1);

        if let Some(latency) = result.latency_ms {
            histogram!(
                "pinger_probe_latency_ms",
                "cluster" => result.cluster.clone(),
                "endpoint" => result.endpoint_url.clone()
            )
            .record(latency as f64);
        }

        if let Some(kind) = result.error_kind {
            counter!(
                "pinger_probe_errors_total",
                "cluster" => result.cluster.clone(),
                "kind" => kind.as_str()
            )
            .increment(1);
        }
    }

    fn record_window(&self, window: &ReportWindow) {
        gauge!("pinger_loss_ratio", "cluster" => window.cluster.clone()).set(window.loss_ratio);
    }
}

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record an endpoint health transition.
pub fn record_endpoint_status(cluster: &str, url: &str, status: HealthStatus) {
    gauge!(
        "pinger_endpoint_status",
        "cluster" => cluster.to_string(),
        "endpoint" => url.to_string()
    )
    .set(status.as_gauge());
}

/// Record rows deleted by the retention job.
pub fn record_retention_deleted(rows: u64) {
    counter!("pinger_retention_deleted_total").increment(rows);
}
