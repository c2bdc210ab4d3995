//! Result sink: fan-out of probe results to the store and metrics.

use std::sync::Arc;

use crate::observability::MetricsSink;
use crate::probe::result::PingResult;
use crate::store::ResultStore;

/// Where probe results go.
#[derive(Clone)]
pub struct ResultSink {
    store: Arc<dyn ResultStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl ResultSink {
    pub fn new(store: Arc<dyn ResultStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { store, metrics }
    }

    /// Record one result. Store failures are logged; probing continues.
    pub async fn emit(&self, result: &PingResult) {
        self.metrics.record_probe(result);

        if let Err(e) = self.store.insert(result).await {
            tracing::warn!(
                cluster = %result.cluster,
                endpoint = %result.endpoint_url,
                error = %e,
                "Failed to persist probe result"
            );
        }
    }
}
