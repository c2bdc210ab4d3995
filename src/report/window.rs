//! Aggregated loss over one report interval.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Results of one cluster inside `[from, to)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportWindow {
    pub cluster: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total: u64,
    pub failed: u64,
    /// `failed / total`; zero for an empty window.
    pub loss_ratio: f64,
}

impl ReportWindow {
    pub fn new(cluster: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>, total: u64, failed: u64) -> Self {
        let loss_ratio = if total == 0 {
            0.0
        } else {
            failed as f64 / total as f64
        };
        Self {
            cluster: cluster.into(),
            from,
            to,
            total,
            failed,
            loss_ratio,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_ratio() {
        let now = Utc::now();
        assert_eq!(ReportWindow::new("a", now, now, 8, 2).loss_ratio, 0.25);
        let empty = ReportWindow::new("a", now, now, 0, 0);
        assert!(empty.is_empty());
        assert_eq!(empty.loss_ratio, 0.0);
    }
}
