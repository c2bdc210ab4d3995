//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single RPC target (immutable identity)
//! - Track its runtime health (Active/Degraded/Failed)
//! - Apply success/failure reports against its retry budget

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RpcEndpointConfig;

/// Health status of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No outstanding failures.
    Active,
    /// Some failures, still within the retry budget.
    Degraded,
    /// Retry budget exhausted; skipped by selection.
    Failed,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Active => "active",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Failed => "failed",
        }
    }

    /// Gauge value exported for the endpoint.
    pub fn as_gauge(&self) -> f64 {
        match self {
            HealthStatus::Active => 0.0,
            HealthStatus::Degraded => 1.0,
            HealthStatus::Failed => 2.0,
        }
    }
}

/// A single RPC target. Never mutated after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// JSON-RPC URL.
    pub url: String,
    /// Optional bearer token.
    pub access_token: Option<String>,
    /// Lower number = tried first.
    pub priority: u32,
    /// Consecutive failures tolerated before the endpoint is marked failed.
    pub max_retry: u32,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, priority: u32, max_retry: u32) -> Self {
        Self {
            url: url.into(),
            access_token: None,
            priority,
            max_retry,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

impl From<&RpcEndpointConfig> for Endpoint {
    fn from(config: &RpcEndpointConfig) -> Self {
        Self {
            url: config.endpoint.clone(),
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.is_empty()),
            priority: config.priority,
            max_retry: config.max_retry,
        }
    }
}

/// Runtime health attached to one endpoint inside a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub status: HealthStatus,
}

impl EndpointHealth {
    pub fn new() -> Self {
        Self {
            consecutive_failures: 0,
            last_success_at: None,
            status: HealthStatus::Active,
        }
    }

    /// Report a successful probe.
    pub fn mark_success(&mut self, at: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.status = HealthStatus::Active;
        self.last_success_at = Some(at);
    }

    /// Report a failed probe. Returns true if this report exhausted the budget.
    pub fn mark_failure(&mut self, max_retry: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.status == HealthStatus::Failed {
            return false;
        }

        if self.consecutive_failures >= max_retry {
            self.status = HealthStatus::Failed;
            true
        } else {
            self.status = HealthStatus::Degraded;
            false
        }
    }

    /// Clear all failure state (cool-down reset).
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.status = HealthStatus::Active;
    }

    pub fn is_selectable(&self) -> bool {
        self.status != HealthStatus::Failed
    }
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self::new()
    }
}
