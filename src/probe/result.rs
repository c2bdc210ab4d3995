//! Probe result record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Classification of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Submission did not finish within `tx_timeout`.
    SubmissionTimeout,
    /// No confirmation within `wait_confirmation_timeout`.
    ConfirmationTimeout,
    /// The endpoint rejected the request.
    RpcError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SubmissionTimeout => "submission_timeout",
            ErrorKind::ConfirmationTimeout => "confirmation_timeout",
            ErrorKind::RpcError => "rpc_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submission_timeout" => Ok(ErrorKind::SubmissionTimeout),
            "confirmation_timeout" => Ok(ErrorKind::ConfirmationTimeout),
            "rpc_error" => Ok(ErrorKind::RpcError),
            other => Err(format!("unknown error kind '{}'", other)),
        }
    }
}

/// Outcome of one probe. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub id: Uuid,
    pub cluster: String,
    pub endpoint_url: String,
    pub started_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set only on success: `confirmed_at - started_at`.
    pub latency_ms: Option<i64>,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
}

impl PingResult {
    /// A confirmed probe that took `elapsed` from start to confirmation.
    pub fn confirmed(
        cluster: &str,
        endpoint_url: &str,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let latency = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
        Self {
            id: Uuid::new_v4(),
            cluster: cluster.to_string(),
            endpoint_url: endpoint_url.to_string(),
            started_at,
            confirmed_at: Some(started_at + latency),
            latency_ms: Some(latency.num_milliseconds()),
            success: true,
            error_kind: None,
        }
    }

    /// A failed probe.
    pub fn failed(
        cluster: &str,
        endpoint_url: &str,
        started_at: DateTime<Utc>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster: cluster.to_string(),
            endpoint_url: endpoint_url.to_string(),
            started_at,
            confirmed_at: None,
            latency_ms: None,
            success: false,
            error_kind: Some(kind),
        }
    }
}
