//! Priority failover pool.
//!
//! # Responsibilities
//! - Own the endpoints of one cluster, sorted by priority
//! - Select the current endpoint (lowest priority number that is not failed)
//! - Absorb success/failure reports from probe workers
//! - Reset every endpoint when all of them have failed (cool-down)

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::config::FailoverConfig;
use crate::failover::endpoint::{Endpoint, EndpointHealth};
use crate::observability::metrics;

/// Errors raised while building a pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The host list was empty.
    #[error("cluster '{0}' has no RPC endpoints configured")]
    NoEndpoints(String),
}

/// Emitted when a failure report moves selection away from the current endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverEvent {
    pub cluster: String,
    pub from: Arc<Endpoint>,
    /// `None` when no endpoint is left; the next selection triggers a cool-down reset.
    pub to: Option<Arc<Endpoint>>,
}

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub url: String,
    pub priority: u32,
    pub max_retry: u32,
    #[serde(flatten)]
    pub health: EndpointHealth,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub cluster: String,
    pub current_endpoint: String,
    pub endpoints: Vec<EndpointSnapshot>,
}

/// Failover pool for a single cluster.
#[derive(Debug)]
pub struct FailoverPool {
    cluster: String,
    /// Sorted by (priority, max_retry, configured order).
    endpoints: Vec<Arc<Endpoint>>,
    /// Parallel to `endpoints`.
    health: Mutex<Vec<EndpointHealth>>,
}

impl FailoverPool {
    /// Build a pool. Fails if `endpoints` is empty.
    pub fn build(cluster: impl Into<String>, mut endpoints: Vec<Endpoint>) -> Result<Self, PoolError> {
        let cluster = cluster.into();
        if endpoints.is_empty() {
            return Err(PoolError::NoEndpoints(cluster));
        }

        // Stable sort keeps configured order for full ties.
        endpoints.sort_by_key(|e| (e.priority, e.max_retry));

        let health = vec![EndpointHealth::new(); endpoints.len()];
        let endpoints: Vec<_> = endpoints.into_iter().map(Arc::new).collect();

        for (rank, e) in endpoints.iter().enumerate() {
            tracing::info!(
                cluster = %cluster,
                rank = rank,
                url = %e.url,
                priority = e.priority,
                max_retry = e.max_retry,
                "Failover endpoint registered"
            );
        }

        Ok(Self {
            cluster,
            endpoints,
            health: Mutex::new(health),
        })
    }

    /// Build a pool from a cluster's failover section.
    pub fn from_config(cluster: &str, config: &FailoverConfig) -> Result<Self, PoolError> {
        Self::build(cluster, config.host_list.iter().map(Endpoint::from).collect())
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// All endpoints in selection order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Return the endpoint new probes should use.
    ///
    /// If every endpoint has failed, all health state is reset and the
    /// top-priority endpoint is returned.
    pub fn current(&self) -> Arc<Endpoint> {
        let mut health = self.lock();

        if let Some(idx) = first_selectable(&health) {
            return self.endpoints[idx].clone();
        }

        tracing::warn!(
            cluster = %self.cluster,
            endpoints = self.endpoints.len(),
            "All endpoints failed, resetting health state"
        );
        for h in health.iter_mut() {
            h.reset();
        }
        self.publish(&health);
        self.endpoints[0].clone()
    }

    /// Report a successful probe against `endpoint`.
    pub fn report_success(&self, endpoint: &Endpoint) {
        self.report_success_at(endpoint, Utc::now());
    }

    /// Report a successful probe observed at `at`.
    pub fn report_success_at(&self, endpoint: &Endpoint, at: DateTime<Utc>) {
        let Some(idx) = self.index_of(endpoint) else {
            tracing::debug!(cluster = %self.cluster, url = %endpoint.url, "Success report for unknown endpoint");
            return;
        };

        let mut health = self.lock();
        let recovered = !health[idx].is_selectable();
        health[idx].mark_success(at);
        if recovered {
            tracing::info!(cluster = %self.cluster, url = %endpoint.url, "Endpoint recovered");
        }
        self.publish(&health);
    }

    /// Report a failed probe against `endpoint`.
    ///
    /// Counters are always updated. A failover event is returned only when the
    /// endpoint was the current selection and this report exhausted its budget.
    pub fn report_failure(&self, endpoint: &Endpoint) -> Option<FailoverEvent> {
        let Some(idx) = self.index_of(endpoint) else {
            tracing::debug!(cluster = %self.cluster, url = %endpoint.url, "Failure report for unknown endpoint");
            return None;
        };

        let mut health = self.lock();
        let selected_before = first_selectable(&health);
        let exhausted = health[idx].mark_failure(self.endpoints[idx].max_retry);
        self.publish(&health);

        if !exhausted {
            tracing::debug!(
                cluster = %self.cluster,
                url = %endpoint.url,
                failures = health[idx].consecutive_failures,
                max_retry = self.endpoints[idx].max_retry,
                "Endpoint failure recorded"
            );
            return None;
        }

        if selected_before != Some(idx) {
            tracing::info!(
                cluster = %self.cluster,
                url = %endpoint.url,
                "Standby endpoint marked failed"
            );
            return None;
        }

        let to = first_selectable(&health).map(|i| self.endpoints[i].clone());
        tracing::warn!(
            cluster = %self.cluster,
            from = %endpoint.url,
            to = to.as_ref().map(|e| e.url.as_str()).unwrap_or("<none>"),
            "Failing over RPC endpoint"
        );

        Some(FailoverEvent {
            cluster: self.cluster.clone(),
            from: self.endpoints[idx].clone(),
            to,
        })
    }

    /// Health of the endpoint with the given URL.
    pub fn health_of(&self, url: &str) -> Option<EndpointHealth> {
        let idx = self.endpoints.iter().position(|e| e.url == url)?;
        Some(self.lock()[idx].clone())
    }

    /// Read-only view. Never triggers a cool-down reset.
    pub fn snapshot(&self) -> PoolSnapshot {
        let health = self.lock();
        let current = first_selectable(&health).unwrap_or(0);

        PoolSnapshot {
            cluster: self.cluster.clone(),
            current_endpoint: self.endpoints[current].url.clone(),
            endpoints: self
                .endpoints
                .iter()
                .zip(health.iter())
                .map(|(e, h)| EndpointSnapshot {
                    url: e.url.clone(),
                    priority: e.priority,
                    max_retry: e.max_retry,
                    health: h.clone(),
                })
                .collect(),
        }
    }

    fn index_of(&self, endpoint: &Endpoint) -> Option<usize> {
        self.endpoints.iter().position(|e| e.url == endpoint.url)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EndpointHealth>> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, health: &[EndpointHealth]) {
        for (e, h) in self.endpoints.iter().zip(health) {
            metrics::record_endpoint_status(&self.cluster, &e.url, h.status);
        }
    }
}

fn first_selectable(health: &[EndpointHealth]) -> Option<usize> {
    health.iter().position(EndpointHealth::is_selectable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::endpoint::HealthStatus;

    fn three() -> FailoverPool {
        FailoverPool::build(
            "testnet",
            vec![
                Endpoint::new("http://a", 1, 2),
                Endpoint::new("http://b", 2, 5),
                Endpoint::new("http://c", 3, 1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = FailoverPool::build("devnet", Vec::new()).unwrap_err();
        assert_eq!(err, PoolError::NoEndpoints("devnet".to_string()));
    }

    #[test]
    fn test_sort_order() {
        let pool = FailoverPool::build(
            "mainnet",
            vec![
                Endpoint::new("http://late", 2, 1),
                Endpoint::new("http://loose", 1, 10),
                Endpoint::new("http://strict", 1, 3),
                Endpoint::new("http://strict-2", 1, 3),
            ],
        )
        .unwrap();
        let order: Vec<_> = pool.endpoints().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(order, vec!["http://strict", "http://strict-2", "http://loose", "http://late"]);
    }

    #[test]
    fn test_failover_after_budget() {
        let pool = three();
        let a = pool.current();
        assert_eq!(a.url, "http://a");

        assert!(pool.report_failure(&a).is_none());
        assert_eq!(pool.current().url, "http://a");
        assert_eq!(pool.health_of("http://a").unwrap().status, HealthStatus::Degraded);

        let event = pool.report_failure(&a).unwrap();
        assert_eq!(event.from.url, "http://a");
        assert_eq!(event.to.unwrap().url, "http://b");
        assert_eq!(pool.current().url, "http://b");
    }

    #[test]
    fn test_standby_failure_does_not_change_selection() {
        let pool = three();
        let c = pool.endpoints()[2].clone();
        assert!(pool.report_failure(&c).is_none());
        assert_eq!(pool.health_of("http://c").unwrap().status, HealthStatus::Failed);
        assert_eq!(pool.current().url, "http://a");
    }

    #[test]
    fn test_cool_down_reset() {
        let pool = three();
        let endpoints: Vec<_> = pool.endpoints().to_vec();
        for e in &endpoints {
            for _ in 0..e.max_retry {
                pool.report_failure(e);
            }
        }
        assert_eq!(pool.snapshot().current_endpoint, "http://a");
        assert!(pool
            .snapshot()
            .endpoints
            .iter()
            .all(|e| e.health.status == HealthStatus::Failed));

        let current = pool.current();
        assert_eq!(current.url, "http://a");
        for e in &endpoints {
            let h = pool.health_of(&e.url).unwrap();
            assert_eq!(h.status, HealthStatus::Active);
            assert_eq!(h.consecutive_failures, 0);
        }
    }

    #[test]
    fn test_last_failure_reports_no_target() {
        let pool = FailoverPool::build("devnet", vec![Endpoint::new("http://only", 1, 1)]).unwrap();
        let only = pool.current();
        let event = pool.report_failure(&only).unwrap();
        assert!(event.to.is_none());
        assert_eq!(pool.current().url, "http://only");
    }

    #[test]
    fn test_unknown_endpoint_ignored() {
        let pool = three();
        assert!(pool.report_failure(&Endpoint::new("http://stranger", 1, 1)).is_none());
        pool.report_success(&Endpoint::new("http://stranger", 1, 1));
        assert_eq!(pool.current().url, "http://a");
    }
}
