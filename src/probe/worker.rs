//! Probe worker pool.
//!
//! # Responsibilities
//! - Run `num_workers` concurrent probe loops for one cluster
//! - Start a batch of `batch_count` probes on every `batch_interval` tick
//! - Enforce the `min_per_ping_time` pacing floor between batches
//! - Forward every result to the sink and failover events to notifiers
//!
//! # Design Decisions
//! - Workers are staggered across one batch interval to spread load
//! - Shutdown stops new batches; in-flight probes finish within their own timeouts

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

use crate::config::PingConfig;
use crate::failover::FailoverPool;
use crate::lifecycle::Shutdown;
use crate::notify::{self, Notification, Notifier};
use crate::probe::runner::{run_probe, ProbeSettings};
use crate::probe::sink::ResultSink;
use crate::probe::transport::ProbeTransport;

/// Concurrent probe loops for one cluster.
pub struct ProbeWorkerPool {
    config: PingConfig,
    settings: ProbeSettings,
    pool: Arc<FailoverPool>,
    transport: Arc<dyn ProbeTransport>,
    sink: ResultSink,
    failover_notifiers: Vec<Arc<dyn Notifier>>,
}

impl ProbeWorkerPool {
    pub fn new(
        config: PingConfig,
        pool: Arc<FailoverPool>,
        transport: Arc<dyn ProbeTransport>,
        sink: ResultSink,
    ) -> Self {
        Self {
            settings: ProbeSettings::from(&config),
            config,
            pool,
            transport,
            sink,
            failover_notifiers: Vec::new(),
        }
    }

    /// Targets notified when the pool fails over.
    pub fn with_failover_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.failover_notifiers = notifiers;
        self
    }

    /// Run all workers until shutdown, then wait for in-flight probes.
    pub async fn run(self, shutdown: Shutdown) {
        let workers = self.config.num_workers.max(1);
        let cluster = self.pool.cluster().to_string();
        let shared = Arc::new(self);

        tracing::info!(
            cluster = %cluster,
            workers = workers,
            batch_count = shared.config.batch_count,
            batch_interval_ms = shared.config.batch_interval,
            "Probe workers starting"
        );

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| tokio::spawn(shared.clone().worker_loop(worker_id, workers, shutdown.clone())))
            .collect();

        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                tracing::error!(cluster = %cluster, worker = worker_id, error = %e, "Probe worker panicked");
            }
        }

        tracing::info!(cluster = %cluster, "Probe workers stopped");
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, workers: usize, shutdown: Shutdown) {
        let period = self.config.batch_interval();
        let stagger = period * worker_id as u32 / workers as u32;
        let mut ticker = interval_at(Instant::now() + stagger, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let min_gap = self.config.min_per_ping_time();
        let mut last_finished: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            if let Some(finished) = last_finished {
                let ready_at = finished + min_gap;
                if ready_at > Instant::now() {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => break,
                        _ = sleep_until(ready_at) => {}
                    }
                }
            }

            let batch = (0..self.config.batch_count.max(1)).map(|_| self.probe_once());
            join_all(batch).await;
            last_finished = Some(Instant::now());
        }

        tracing::debug!(cluster = %self.pool.cluster(), worker = worker_id, "Probe worker exiting");
    }

    async fn probe_once(&self) {
        let outcome = run_probe(&self.pool, self.transport.as_ref(), &self.settings).await;
        self.sink.emit(&outcome.result).await;

        if let Some(event) = outcome.failover {
            if self.failover_notifiers.is_empty() {
                return;
            }
            // Off the probe path so a slow webhook never holds up the batch.
            let notifiers = self.failover_notifiers.clone();
            tokio::spawn(async move {
                notify::dispatch(&notifiers, &Notification::failover(&event)).await;
            });
        }
    }
}
