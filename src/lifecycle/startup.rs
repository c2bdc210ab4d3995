//! Startup orchestration.
//!
//! # Responsibilities
//! - Select the clusters this process probes
//! - Initialize the result store, metrics exporter and status board
//! - Build one failover pool, wallet and probe client per cluster
//! - Start probe workers, report engines, retention and the status API
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Everything shared lives in `AppContext`; no component reads globals
//! - After startup, component failures are logged and isolated

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::api;
use crate::blockchain::{BlockchainError, RpcProbeClient, Wallet};
use crate::config::{ClusterConfig, DatabaseConfig, PingerConfig};
use crate::failover::{FailoverPool, PoolError};
use crate::lifecycle::{signals::shutdown_on_signal, Shutdown};
use crate::notify::webhook;
use crate::observability::{metrics, MetricsSink, PrometheusSink};
use crate::probe::{ProbeWorkerPool, ResultSink};
use crate::report::ReportEngine;
use crate::retention::RetentionJob;
use crate::status::StatusBoard;
use crate::store::{MemoryStore, PgResultStore, ResultStore, StoreError};

/// Slack between a probe finishing and its row being visible to the report query.
const REPORT_WRITE_MARGIN: Duration = Duration::from_secs(5);

/// Environment variable read by the cloud SQL credential helper.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unknown cluster '{0}' in --clusters")]
    UnknownCluster(String),

    #[error("no clusters selected")]
    NoClusters,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("metrics exporter failed: {0}")]
    Metrics(String),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error("webhook client failed: {0}")]
    Http(#[from] reqwest::Error),
}

struct ClusterRuntime {
    config: ClusterConfig,
    pool: Arc<FailoverPool>,
}

/// Everything the running pinger shares, built once at startup.
pub struct AppContext {
    config: PingerConfig,
    store: Arc<dyn ResultStore>,
    metrics: Arc<dyn MetricsSink>,
    board: Arc<StatusBoard>,
    webhook_client: reqwest::Client,
    clusters: Vec<ClusterRuntime>,
}

impl AppContext {
    /// Initialize shared subsystems for the clusters named by `selection`
    /// ("all" or a comma separated list).
    pub async fn build(config: PingerConfig, selection: &str) -> Result<Self, StartupError> {
        let selected = select_clusters(&config, selection)?;
        apply_credentials_env(&config.database);

        let store: Arc<dyn ResultStore> = if config.database.url.trim().is_empty() {
            tracing::warn!("No database configured, keeping results in memory");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(PgResultStore::connect(&config.database).await?)
        };

        if config.metrics.enabled {
            let addr: SocketAddr = config
                .metrics
                .bind_address
                .parse()
                .map_err(|_| StartupError::Metrics(format!("invalid address '{}'", config.metrics.bind_address)))?;
            metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
        }

        let board = Arc::new(StatusBoard::new());
        let mut clusters = Vec::with_capacity(selected.len());
        for cluster in selected {
            let pool = Arc::new(FailoverPool::from_config(&cluster.name, &cluster.failover)?);
            board.register(pool.clone());
            clusters.push(ClusterRuntime { config: cluster, pool });
        }

        tracing::info!(
            clusters = ?clusters.iter().map(|c| c.config.name.as_str()).collect::<Vec<_>>(),
            "Application context ready"
        );

        Ok(Self {
            config,
            store,
            metrics: Arc::new(PrometheusSink),
            board,
            webhook_client: webhook::webhook_client()?,
            clusters,
        })
    }

    pub fn board(&self) -> Arc<StatusBoard> {
        self.board.clone()
    }

    /// Start every component and wait until shutdown has drained them.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), StartupError> {
        let mut tasks: Vec<(String, JoinHandle<()>)> = Vec::new();

        for cluster in &self.clusters {
            let name = cluster.config.name.clone();

            if cluster.config.ping.enabled {
                let wallet = Wallet::from_env(cluster.config.chain_id)?;
                let transport = RpcProbeClient::new(
                    wallet,
                    cluster.config.ping.receiver.as_deref(),
                    cluster.pool.endpoints(),
                )?;
                let workers = ProbeWorkerPool::new(
                    cluster.config.ping.clone(),
                    cluster.pool.clone(),
                    Arc::new(transport),
                    ResultSink::new(self.store.clone(), self.metrics.clone()),
                )
                .with_failover_notifiers(webhook::failover_notifiers(
                    &cluster.config.failover,
                    &cluster.config.report.discord,
                    &self.webhook_client,
                ));
                tasks.push((format!("probe:{}", name), tokio::spawn(workers.run(shutdown.clone()))));
            } else {
                tracing::info!(cluster = %name, "Probing disabled, serving status only");
            }

            let engine = ReportEngine::new(cluster.pool.clone(), cluster.config.report.clone(), self.store.clone())
                .with_settle_delay(cluster.config.ping.max_probe_duration() + REPORT_WRITE_MARGIN)
                .with_board(self.board.clone())
                .with_metrics(self.metrics.clone())
                .with_alert_notifiers(webhook::alert_notifiers(&cluster.config.report, &self.webhook_client))
                .with_report_notifiers(webhook::report_notifiers(&cluster.config.report, &self.webhook_client));
            tasks.push((format!("report:{}", name), tokio::spawn(engine.run(shutdown.clone()))));
        }

        if self.config.retention.enabled {
            let job = RetentionJob::from_config(self.store.clone(), &self.config.retention);
            tasks.push(("retention".to_string(), tokio::spawn(job.run(shutdown.clone()))));
        }

        if self.config.api.enabled {
            let api_config = self.config.api.clone();
            let board = self.board.clone();
            let api_shutdown = shutdown.clone();
            tasks.push((
                "api".to_string(),
                tokio::spawn(async move {
                    if let Err(e) = api::serve(api_config, board, api_shutdown).await {
                        tracing::error!(error = %e, "Status API stopped with error");
                    }
                }),
            ));
        }

        tokio::spawn(shutdown_on_signal(shutdown.clone()));
        tracing::info!(tasks = tasks.len(), "Pinger running");

        for (name, handle) in tasks {
            if let Err(e) = handle.await {
                tracing::error!(task = %name, error = %e, "Task panicked");
            }
        }

        tracing::info!("All tasks stopped");
        Ok(())
    }
}

/// Resolve `--clusters`. "all" (or empty) selects every configured cluster.
pub fn select_clusters(config: &PingerConfig, selection: &str) -> Result<Vec<ClusterConfig>, StartupError> {
    let selection = selection.trim();
    let selected = if selection.is_empty() || selection.eq_ignore_ascii_case("all") {
        config.clusters.clone()
    } else {
        selection
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                config
                    .cluster(name)
                    .cloned()
                    .ok_or_else(|| StartupError::UnknownCluster(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    if selected.is_empty() {
        return Err(StartupError::NoClusters);
    }
    Ok(selected)
}

/// Export the configured credential path unless the environment already has one.
pub fn apply_credentials_env(database: &DatabaseConfig) {
    let Some(path) = database.gcloud_credential_path.as_deref().filter(|p| !p.is_empty()) else {
        return;
    };
    if std::env::var_os(CREDENTIALS_ENV_VAR).is_some() {
        tracing::debug!("{} already set, leaving it", CREDENTIALS_ENV_VAR);
        return;
    }
    std::env::set_var(CREDENTIALS_ENV_VAR, path);
    tracing::info!(path = %path, "Credential path exported to {}", CREDENTIALS_ENV_VAR);
}
