//! Notification subsystem.
//!
//! # Data Flow
//! ```text
//! ReportEngine (alert / recovery / report)  ─┐
//! ProbeWorkerPool (failover)                 ─┼→ Notification
//!                                             └→ dispatch() → each Notifier
//!                                                 → webhook.rs (Slack / Discord POST)
//! ```
//!
//! # Design Decisions
//! - Slack and Discord targets are independent; both may fire for one event
//! - Delivery errors are logged, never retried synchronously, never fatal

pub mod webhook;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::failover::FailoverEvent;
use crate::report::ReportWindow;

pub use webhook::{WebhookFlavor, WebhookNotifier};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Loss crossed the threshold.
    Alert,
    /// Loss dropped back below the threshold.
    Recovery,
    /// Periodic summary.
    Report,
    /// The pool switched endpoints.
    Failover,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "alert",
            NotificationKind::Recovery => "recovery",
            NotificationKind::Report => "report",
            NotificationKind::Failover => "failover",
        }
    }
}

/// A message for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub cluster: String,
    pub endpoint: Option<String>,
    pub loss_ratio: Option<f64>,
    pub total: Option<u64>,
    pub failed: Option<u64>,
    pub detail: Option<String>,
}

impl Notification {
    fn from_window(kind: NotificationKind, window: &ReportWindow, endpoint: Option<String>) -> Self {
        Self {
            kind,
            cluster: window.cluster.clone(),
            endpoint,
            loss_ratio: Some(window.loss_ratio),
            total: Some(window.total),
            failed: Some(window.failed),
            detail: None,
        }
    }

    pub fn alert(window: &ReportWindow, endpoint: Option<String>, threshold: f64) -> Self {
        let mut n = Self::from_window(NotificationKind::Alert, window, endpoint);
        n.detail = Some(format!("loss threshold {:.1}% reached", threshold * 100.0));
        n
    }

    pub fn recovery(window: &ReportWindow, endpoint: Option<String>) -> Self {
        Self::from_window(NotificationKind::Recovery, window, endpoint)
    }

    pub fn report(window: &ReportWindow, endpoint: Option<String>) -> Self {
        Self::from_window(NotificationKind::Report, window, endpoint)
    }

    pub fn failover(event: &FailoverEvent) -> Self {
        let detail = match &event.to {
            Some(to) => format!("switched from {} to {}", event.from.url, to.url),
            None => format!("{} failed and no endpoint is left; resetting", event.from.url),
        };
        Self {
            kind: NotificationKind::Failover,
            cluster: event.cluster.clone(),
            endpoint: Some(event.from.url.clone()),
            loss_ratio: None,
            total: None,
            failed: None,
            detail: Some(detail),
        }
    }

    /// One-line headline.
    pub fn title(&self) -> String {
        match self.kind {
            NotificationKind::Alert => format!("[{}] ALERT: probe loss above threshold", self.cluster),
            NotificationKind::Recovery => format!("[{}] RECOVERED: probe loss back to normal", self.cluster),
            NotificationKind::Report => format!("[{}] Probe report", self.cluster),
            NotificationKind::Failover => format!("[{}] RPC endpoint failover", self.cluster),
        }
    }

    /// Multi-line plain text body.
    pub fn body(&self) -> String {
        let mut lines = Vec::new();
        if let Some(endpoint) = &self.endpoint {
            lines.push(format!("endpoint: {}", endpoint));
        }
        if let Some(ratio) = self.loss_ratio {
            lines.push(format!("loss: {:.2}%", ratio * 100.0));
        }
        if let (Some(total), Some(failed)) = (self.total, self.failed) {
            lines.push(format!("failed/total: {}/{}", failed, total));
        }
        if let Some(detail) = &self.detail {
            lines.push(detail.clone());
        }
        lines.join("\n")
    }
}

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// A notification target.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Target name for logs.
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver to every notifier, logging failures.
pub async fn dispatch(notifiers: &[Arc<dyn Notifier>], notification: &Notification) {
    for notifier in notifiers {
        match notifier.send(notification).await {
            Ok(()) => tracing::info!(
                target_name = notifier.name(),
                cluster = %notification.cluster,
                kind = notification.kind.as_str(),
                "Notification sent"
            ),
            Err(e) => tracing::warn!(
                target_name = notifier.name(),
                cluster = %notification.cluster,
                kind = notification.kind.as_str(),
                error = %e,
                "Notification delivery failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::Endpoint;
    use chrono::Utc;

    fn window() -> ReportWindow {
        let now = Utc::now();
        ReportWindow::new("mainnet", now - chrono::Duration::minutes(10), now, 10, 3)
    }

    #[test]
    fn test_alert_body() {
        let n = Notification::alert(&window(), Some("http://a".into()), 0.2);
        assert_eq!(n.kind, NotificationKind::Alert);
        let body = n.body();
        assert!(body.contains("endpoint: http://a"));
        assert!(body.contains("loss: 30.00%"));
        assert!(body.contains("failed/total: 3/10"));
        assert!(body.contains("20.0%"));
        assert!(n.title().starts_with("[mainnet] ALERT"));
    }

    #[test]
    fn test_failover_detail() {
        let event = FailoverEvent {
            cluster: "devnet".into(),
            from: Arc::new(Endpoint::new("http://a", 1, 1)),
            to: Some(Arc::new(Endpoint::new("http://b", 2, 1))),
        };
        let n = Notification::failover(&event);
        assert_eq!(n.detail.as_deref(), Some("switched from http://a to http://b"));
        assert!(n.loss_ratio.is_none());
    }
}
