//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pinger.
//! All types derive Serde traits for deserialization from config files.
//! Every cluster section holds its sub-configurations as named fields.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the pinger.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PingerConfig {
    /// Result store connection.
    pub database: DatabaseConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,

    /// Pruning of persisted results.
    pub retention: RetentionConfig,

    /// Read-only status API.
    pub api: ApiConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Monitored clusters.
    pub clusters: Vec<ClusterConfig>,
}

impl PingerConfig {
    /// Look up a cluster section by name.
    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|c| c.name == name)
    }
}

/// Result store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Empty keeps results in memory.
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,

    /// Cloud storage credential file exported to the store driver.
    pub gcloud_credential_path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            gcloud_credential_path: None,
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Enable periodic pruning.
    pub enabled: bool,

    /// Results older than this many hours are deleted.
    pub keep_hours: u64,

    /// Seconds between pruning runs.
    pub update_interval_sec: u64,
}

impl RetentionConfig {
    pub fn keep(&self) -> Duration {
        Duration::from_secs(self.keep_hours.saturating_mul(3600))
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_sec.max(1))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_hours: 24 * 7,
            update_interval_sec: 3600,
        }
    }
}

/// Status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Enable the status API.
    pub enabled: bool,

    /// Listener mode: "http", "https" or "both".
    pub mode: String,

    /// Plain HTTP bind address.
    pub bind_address: String,

    /// HTTPS bind address.
    pub tls_bind_address: String,

    /// Path to certificate file (PEM).
    pub cert_path: Option<String>,

    /// Path to private key file (PEM).
    pub key_path: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: "http".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            tls_bind_address: "0.0.0.0:8443".to_string(),
            cert_path: None,
            key_path: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,

    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "rpc_pinger=info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// One monitored cluster.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Cluster identifier used in results, metrics and alerts.
    pub name: String,

    /// Chain ID used when signing probe transactions.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default)]
    pub ping: PingConfig,

    #[serde(default)]
    pub failover: FailoverConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

fn default_chain_id() -> u64 {
    1
}

/// Probe traffic configuration. Durations are milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PingConfig {
    /// Run probe workers for this cluster.
    pub enabled: bool,

    /// Destination of the zero-value probe transfer (defaults to the wallet itself).
    pub receiver: Option<String>,

    /// Concurrent probe loops.
    pub num_workers: usize,

    /// Probes submitted together on every batch tick.
    pub batch_count: usize,

    /// Spacing between batch ticks.
    pub batch_interval: u64,

    /// Upper bound for transaction submission.
    pub tx_timeout: u64,

    /// Upper bound for confirmation polling.
    pub wait_confirmation_timeout: u64,

    /// Spacing between confirmation polls.
    pub status_check_interval: u64,

    /// Pacing floor between the end of one batch and the start of the next.
    pub min_per_ping_time: u64,

    /// Retry fee-rejected submissions once with legacy pricing.
    pub compute_fee_dual_mode: bool,

    /// Gas limit of the probe transaction.
    pub request_units: u32,

    /// Priority fee per unit.
    pub compute_unit_price: u64,
}

impl PingConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval.max(1))
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout)
    }

    pub fn wait_confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_confirmation_timeout)
    }

    pub fn status_check_interval(&self) -> Duration {
        Duration::from_millis(self.status_check_interval.max(1))
    }

    pub fn min_per_ping_time(&self) -> Duration {
        Duration::from_millis(self.min_per_ping_time)
    }

    /// Longest a single probe can take before its result is written.
    pub fn max_probe_duration(&self) -> Duration {
        self.tx_timeout() + self.wait_confirmation_timeout()
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            receiver: None,
            num_workers: 1,
            batch_count: 1,
            batch_interval: 1000,
            tx_timeout: 10_000,
            wait_confirmation_timeout: 30_000,
            status_check_interval: 500,
            min_per_ping_time: 2000,
            compute_fee_dual_mode: false,
            request_units: 21_000,
            compute_unit_price: 1_000_000_000,
        }
    }
}

/// One RPC target in a cluster's host list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEndpointConfig {
    /// JSON-RPC URL.
    pub endpoint: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Lower values are tried first.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Consecutive failures tolerated before failing over.
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

fn default_priority() -> u32 {
    1
}

fn default_max_retry() -> u32 {
    30
}

/// A single webhook target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub webhook: String,
}

/// Failover configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverConfig {
    /// Endpoints in any order; the pool sorts them by priority.
    pub host_list: Vec<RpcEndpointConfig>,

    /// Slack target for failover notices.
    pub slack_alert: WebhookConfig,

    /// Discord target for failover notices.
    pub discord_alert: WebhookConfig,
}

/// Slack report/alert targets.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SlackConfig {
    pub report: WebhookConfig,
    pub alert: WebhookConfig,
}

/// Discord report/alert targets and bot identity.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscordConfig {
    pub bot_name: String,
    pub bot_avatar_url: String,
    pub report: WebhookConfig,
    pub alert: WebhookConfig,
}

/// Loss reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Send a summary report every tick.
    pub enabled: bool,

    /// Seconds per report window.
    pub interval: u64,

    /// Loss ratio at or above which the cluster is alerting.
    pub loss_threshold: f64,

    /// Checkpoint file for the alerting flag.
    pub level_file_path: Option<String>,

    pub slack: SlackConfig,

    pub discord: DiscordConfig,
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 600,
            loss_threshold: 0.5,
            level_file_path: None,
            slack: SlackConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

/// Listener mode of the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Http,
    Https,
    Both,
}

impl ConnectionMode {
    /// Normalise a configured mode. Unrecognised values fall back to HTTP.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => ConnectionMode::Http,
            "https" => ConnectionMode::Https,
            "both" => ConnectionMode::Both,
            other => {
                tracing::warn!(mode = %other, "Unsupported API server mode, using http");
                ConnectionMode::Http
            }
        }
    }

    pub fn needs_tls(&self) -> bool {
        matches!(self, ConnectionMode::Https | ConnectionMode::Both)
    }
}
