//! Read-only status view.
//!
//! # Data Flow
//! ```text
//! FailoverPool (live health)   ─┐
//! ReportEngine::record_window  ─┼→ StatusBoard → ClusterStatus → api/
//! ```
//!
//! # Design Decisions
//! - Windows are swapped in with ArcSwap; readers never block writers
//! - Reading a status never mutates a pool (no cool-down reset on read)

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::failover::{EndpointSnapshot, FailoverPool};
use crate::report::ReportWindow;

/// Loss summary of the latest report window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub total: u64,
    pub failed: u64,
    pub loss_ratio: f64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl From<&ReportWindow> for WindowSummary {
    fn from(window: &ReportWindow) -> Self {
        Self {
            total: window.total,
            failed: window.failed,
            loss_ratio: window.loss_ratio,
            from: window.from,
            to: window.to,
        }
    }
}

/// What the status API answers for one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatus {
    pub cluster: String,
    pub current_endpoint: String,
    pub endpoints: Vec<EndpointSnapshot>,
    pub last_window: Option<WindowSummary>,
}

struct BoardEntry {
    pool: Arc<FailoverPool>,
    last_window: ArcSwapOption<ReportWindow>,
}

/// Latest state of every probed cluster.
#[derive(Default)]
pub struct StatusBoard {
    clusters: DashMap<String, BoardEntry>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a cluster's pool.
    pub fn register(&self, pool: Arc<FailoverPool>) {
        let name = pool.cluster().to_string();
        self.clusters.insert(
            name,
            BoardEntry {
                pool,
                last_window: ArcSwapOption::empty(),
            },
        );
    }

    /// Replace the latest window of a cluster. Unknown clusters are ignored.
    pub fn record_window(&self, window: ReportWindow) {
        match self.clusters.get(&window.cluster) {
            Some(entry) => entry.last_window.store(Some(Arc::new(window))),
            None => tracing::debug!(cluster = %window.cluster, "Window for unregistered cluster dropped"),
        }
    }

    pub fn cluster(&self, name: &str) -> Option<ClusterStatus> {
        self.clusters.get(name).map(|entry| status_of(&entry))
    }

    /// Status of every cluster, sorted by name.
    pub fn all(&self) -> Vec<ClusterStatus> {
        let mut statuses: Vec<_> = self.clusters.iter().map(|entry| status_of(entry.value())).collect();
        statuses.sort_by(|a, b| a.cluster.cmp(&b.cluster));
        statuses
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

fn status_of(entry: &BoardEntry) -> ClusterStatus {
    let snapshot = entry.pool.snapshot();
    let last_window = entry.last_window.load();
    ClusterStatus {
        cluster: snapshot.cluster,
        current_endpoint: snapshot.current_endpoint,
        endpoints: snapshot.endpoints,
        last_window: last_window.as_deref().map(WindowSummary::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::{Endpoint, HealthStatus};

    fn pool(cluster: &str) -> Arc<FailoverPool> {
        Arc::new(
            FailoverPool::build(
                cluster,
                vec![Endpoint::new("http://a", 1, 1), Endpoint::new("http://b", 2, 1)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_status_follows_pool() {
        let board = StatusBoard::new();
        let p = pool("mainnet");
        board.register(p.clone());

        let status = board.cluster("mainnet").unwrap();
        assert_eq!(status.current_endpoint, "http://a");
        assert!(status.last_window.is_none());

        p.report_failure(&p.endpoints()[0]);
        let status = board.cluster("mainnet").unwrap();
        assert_eq!(status.current_endpoint, "http://b");
        assert_eq!(status.endpoints[0].health.status, HealthStatus::Failed);
    }

    #[test]
    fn test_record_window() {
        let board = StatusBoard::new();
        board.register(pool("devnet"));
        let now = Utc::now();
        board.record_window(ReportWindow::new("devnet", now, now, 4, 1));
        board.record_window(ReportWindow::new("unknown", now, now, 4, 1));

        let window = board.cluster("devnet").unwrap().last_window.unwrap();
        assert_eq!(window.loss_ratio, 0.25);
        assert!(board.cluster("unknown").is_none());
    }

    #[test]
    fn test_all_sorted() {
        let board = StatusBoard::new();
        board.register(pool("testnet"));
        board.register(pool("devnet"));
        let names: Vec<_> = board.all().into_iter().map(|s| s.cluster).collect();
        assert_eq!(names, vec!["devnet", "testnet"]);
    }
}
