//! Single probe execution.
//!
//! # Responsibilities
//! - Pick the pool's current endpoint
//! - Submit a probe transaction within `tx_timeout` (with the legacy-fee fallback)
//! - Poll for confirmation every `status_check_interval`, bounded by `wait_confirmation_timeout`
//! - Classify the outcome and report it back to the pool

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

use crate::config::PingConfig;
use crate::failover::{Endpoint, FailoverEvent, FailoverPool};
use crate::probe::result::{ErrorKind, PingResult};
use crate::probe::transport::{FeeMode, ProbeTransport, TransportError};

/// Timing and fee parameters of a probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub tx_timeout: Duration,
    pub wait_confirmation_timeout: Duration,
    pub status_check_interval: Duration,
    pub dual_fee_mode: bool,
    pub request_units: u32,
    pub compute_unit_price: u64,
}

impl ProbeSettings {
    fn primary_fee(&self) -> FeeMode {
        FeeMode::Priority {
            request_units: self.request_units,
            compute_unit_price: self.compute_unit_price,
        }
    }

    fn legacy_fee(&self) -> FeeMode {
        FeeMode::Legacy {
            request_units: self.request_units,
        }
    }
}

impl From<&PingConfig> for ProbeSettings {
    fn from(config: &PingConfig) -> Self {
        Self {
            tx_timeout: config.tx_timeout(),
            wait_confirmation_timeout: config.wait_confirmation_timeout(),
            status_check_interval: config.status_check_interval(),
            dual_fee_mode: config.compute_fee_dual_mode,
            request_units: config.request_units,
            compute_unit_price: config.compute_unit_price,
        }
    }
}

/// Everything a finished probe produced.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub endpoint: Arc<Endpoint>,
    pub result: PingResult,
    pub failover: Option<FailoverEvent>,
}

/// Run one probe against the pool's current endpoint.
pub async fn run_probe(
    pool: &FailoverPool,
    transport: &dyn ProbeTransport,
    settings: &ProbeSettings,
) -> ProbeOutcome {
    let started_at = Utc::now();
    let started = Instant::now();
    let endpoint = pool.current();
    let cluster = pool.cluster();

    match probe_endpoint(cluster, &endpoint, transport, settings).await {
        Ok(()) => {
            pool.report_success(&endpoint);
            let result = PingResult::confirmed(cluster, &endpoint.url, started_at, started.elapsed());
            tracing::debug!(
                cluster = %cluster,
                endpoint = %endpoint.url,
                latency_ms = result.latency_ms,
                "Probe confirmed"
            );
            ProbeOutcome {
                endpoint,
                result,
                failover: None,
            }
        }
        Err(kind) => {
            let failover = pool.report_failure(&endpoint);
            ProbeOutcome {
                result: PingResult::failed(cluster, &endpoint.url, started_at, kind),
                endpoint,
                failover,
            }
        }
    }
}

async fn probe_endpoint(
    cluster: &str,
    endpoint: &Endpoint,
    transport: &dyn ProbeTransport,
    settings: &ProbeSettings,
) -> Result<(), ErrorKind> {
    let tx_id = match timeout(settings.tx_timeout, submit(endpoint, transport, settings)).await {
        Ok(Ok(tx_id)) => tx_id,
        Ok(Err(e)) => {
            tracing::warn!(cluster = %cluster, endpoint = %endpoint.url, error = %e, "Probe submission rejected");
            return Err(ErrorKind::RpcError);
        }
        Err(_) => {
            tracing::warn!(
                cluster = %cluster,
                endpoint = %endpoint.url,
                timeout_ms = settings.tx_timeout.as_millis() as u64,
                "Probe submission timed out"
            );
            return Err(ErrorKind::SubmissionTimeout);
        }
    };

    let confirmation = wait_for_confirmation(endpoint, transport, &tx_id, settings.status_check_interval);
    match timeout(settings.wait_confirmation_timeout, confirmation).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::warn!(cluster = %cluster, endpoint = %endpoint.url, tx = %tx_id, error = %e, "Probe confirmation failed");
            Err(ErrorKind::RpcError)
        }
        Err(_) => {
            tracing::warn!(
                cluster = %cluster,
                endpoint = %endpoint.url,
                tx = %tx_id,
                timeout_ms = settings.wait_confirmation_timeout.as_millis() as u64,
                "Probe not confirmed in time"
            );
            transport.abandon(endpoint, &tx_id);
            Err(ErrorKind::ConfirmationTimeout)
        }
    }
}

/// Submit with priority fees; in dual mode retry once with legacy fees if the
/// endpoint rejected the fee parameters.
async fn submit(
    endpoint: &Endpoint,
    transport: &dyn ProbeTransport,
    settings: &ProbeSettings,
) -> Result<String, TransportError> {
    match transport.submit(endpoint, settings.primary_fee()).await {
        Err(TransportError::FeeRejected(reason)) if settings.dual_fee_mode => {
            tracing::debug!(endpoint = %endpoint.url, reason = %reason, "Priority fee rejected, retrying with legacy fee");
            transport.submit(endpoint, settings.legacy_fee()).await
        }
        other => other,
    }
}

async fn wait_for_confirmation(
    endpoint: &Endpoint,
    transport: &dyn ProbeTransport,
    tx_id: &str,
    poll_interval: Duration,
) -> Result<(), TransportError> {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if transport.is_confirmed(endpoint, tx_id).await? {
            return Ok(());
        }
        tracing::trace!(endpoint = %endpoint.url, tx = %tx_id, "Probe pending");
    }
}
