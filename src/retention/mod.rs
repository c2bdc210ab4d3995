//! Result retention.
//!
//! Deletes results older than `keep_hours` every `update_interval_sec`. Runs
//! against the store on its own schedule; a failed delete is logged and tried
//! again on the next tick.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetentionConfig;
use crate::lifecycle::{periodic::run_periodic, Shutdown};
use crate::observability::metrics;
use crate::store::{ResultStore, StoreResult};

/// Periodic pruning of old probe results.
pub struct RetentionJob {
    store: Arc<dyn ResultStore>,
    keep: Duration,
    interval: Duration,
}

impl RetentionJob {
    pub fn new(store: Arc<dyn ResultStore>, keep: Duration, interval: Duration) -> Self {
        Self { store, keep, interval }
    }

    pub fn from_config(store: Arc<dyn ResultStore>, config: &RetentionConfig) -> Self {
        Self::new(store, config.keep(), config.update_interval())
    }

    /// Oldest `started_at` that survives a run at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let keep = chrono::Duration::from_std(self.keep).unwrap_or(chrono::Duration::MAX);
        now.checked_sub_signed(keep).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Delete everything older than the horizon, as of `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let cutoff = self.cutoff(now);
        let deleted = self.store.delete_older_than(cutoff).await?;
        metrics::record_retention_deleted(deleted);
        tracing::info!(cutoff = %cutoff, deleted = deleted, "Retention pass complete");
        Ok(deleted)
    }

    pub async fn run(self, shutdown: Shutdown) {
        let job = Arc::new(self);
        let period = job.interval;
        run_periodic("retention", period, shutdown, move || {
            let job = job.clone();
            async move {
                if let Err(e) = job.run_once(Utc::now()).await {
                    tracing::error!(error = %e, "Retention pass failed, retrying next tick");
                }
            }
        })
        .await;
    }
}
