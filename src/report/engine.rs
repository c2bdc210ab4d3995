//! Periodic loss reporting with alert hysteresis.
//!
//! # Responsibilities
//! - Aggregate the trailing `report.interval` of results into a `ReportWindow`
//! - Fire one alert when loss reaches the threshold and one recovery when it drops
//! - Send a summary report on every tick when reporting is enabled
//! - Publish the window to the status board and metrics
//!
//! # Settle delay
//! Results are written when a probe finishes, which can be long after the
//! `started_at` the window selects on. The window therefore ends
//! `settle_delay` before the tick, so slow failures land in exactly one window.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::ReportConfig;
use crate::failover::FailoverPool;
use crate::lifecycle::{periodic::run_periodic, Shutdown};
use crate::notify::{self, Notification, Notifier};
use crate::observability::MetricsSink;
use crate::report::alert_state::{AlertCheckpoint, AlertState, Transition};
use crate::report::window::ReportWindow;
use crate::status::StatusBoard;
use crate::store::{ResultStore, StoreError};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No results in the window; nothing was evaluated.
    Empty,
    Evaluated {
        window: ReportWindow,
        transition: Transition,
    },
}

/// Report loop for one cluster.
pub struct ReportEngine {
    pool: Arc<FailoverPool>,
    config: ReportConfig,
    store: Arc<dyn ResultStore>,
    settle_delay: Duration,
    state: AlertState,
    checkpoint: Option<AlertCheckpoint>,
    board: Option<Arc<StatusBoard>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    alert_notifiers: Vec<Arc<dyn Notifier>>,
    report_notifiers: Vec<Arc<dyn Notifier>>,
}

impl ReportEngine {
    /// Create an engine. If a checkpoint path is configured the alert flag
    /// is restored from it.
    pub fn new(pool: Arc<FailoverPool>, config: ReportConfig, store: Arc<dyn ResultStore>) -> Self {
        let checkpoint = config
            .level_file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| AlertCheckpoint::new(p, pool.cluster()));
        let state = checkpoint
            .as_ref()
            .map(AlertCheckpoint::load_or_default)
            .unwrap_or_default();

        if state.currently_alerting {
            tracing::info!(cluster = %pool.cluster(), "Restored alerting state from checkpoint");
        }

        Self {
            pool,
            config,
            store,
            settle_delay: Duration::ZERO,
            state,
            checkpoint,
            board: None,
            metrics: None,
            alert_notifiers: Vec::new(),
            report_notifiers: Vec::new(),
        }
    }

    /// Lag the window end behind the tick by the longest a probe can run.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_board(mut self, board: Arc<StatusBoard>) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_alert_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.alert_notifiers = notifiers;
        self
    }

    pub fn with_report_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.report_notifiers = notifiers;
        self
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Evaluate the window ending `settle_delay` before `now`.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, StoreError> {
        let cluster = self.pool.cluster().to_string();
        let span = chrono::Duration::from_std(self.config.interval()).unwrap_or(chrono::Duration::MAX);
        let settle = chrono::Duration::from_std(self.settle_delay).unwrap_or(chrono::Duration::zero());
        let to = now.checked_sub_signed(settle).unwrap_or(now);
        let from = to.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let counts = self.store.window_counts(&cluster, from, to).await?;
        let window = ReportWindow::new(cluster.as_str(), from, to, counts.total, counts.failed);
        if window.is_empty() {
            tracing::debug!(cluster = %cluster, "Report window empty, skipping");
            return Ok(TickOutcome::Empty);
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_window(&window);
        }
        if let Some(board) = &self.board {
            board.record_window(window.clone());
        }

        let endpoint = Some(self.pool.snapshot().current_endpoint);
        let threshold = self.config.loss_threshold;
        let transition = self.state.evaluate(window.loss_ratio, threshold);

        match transition {
            Transition::Alert => {
                tracing::warn!(
                    cluster = %cluster,
                    loss_ratio = window.loss_ratio,
                    threshold = threshold,
                    "Probe loss reached threshold, alerting"
                );
                notify::dispatch(&self.alert_notifiers, &Notification::alert(&window, endpoint.clone(), threshold)).await;
                self.save_state();
            }
            Transition::Recovery => {
                tracing::info!(cluster = %cluster, loss_ratio = window.loss_ratio, "Probe loss recovered");
                notify::dispatch(&self.alert_notifiers, &Notification::recovery(&window, endpoint.clone())).await;
                self.save_state();
            }
            Transition::None => {}
        }

        if self.config.enabled {
            notify::dispatch(&self.report_notifiers, &Notification::report(&window, endpoint)).await;
        }

        tracing::info!(
            cluster = %cluster,
            total = window.total,
            failed = window.failed,
            loss_ratio = window.loss_ratio,
            alerting = self.state.currently_alerting,
            "Report window evaluated"
        );

        Ok(TickOutcome::Evaluated { window, transition })
    }

    /// Tick every `report.interval` until shutdown.
    pub async fn run(self, shutdown: Shutdown) {
        let period = self.config.interval();
        let engine = Arc::new(Mutex::new(self));
        run_periodic("report", period, shutdown, move || {
            let engine = engine.clone();
            async move {
                let mut engine = engine.lock().await;
                if let Err(e) = engine.tick_at(Utc::now()).await {
                    // Retried on the next tick.
                    tracing::error!(cluster = %engine.pool.cluster(), error = %e, "Report tick failed");
                }
            }
        })
        .await;
    }

    fn save_state(&self) {
        if let Some(checkpoint) = &self.checkpoint {
            if let Err(e) = checkpoint.save(self.state) {
                tracing::warn!(
                    cluster = %self.pool.cluster(),
                    path = %checkpoint.path().display(),
                    error = %e,
                    "Failed to write alert checkpoint"
                );
            }
        }
    }
}
