//! Slack and Discord webhook delivery.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DiscordConfig, FailoverConfig, ReportConfig, WebhookConfig};
use crate::notify::{Notification, NotificationKind, Notifier, NotifyError};

/// Payload style of a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookFlavor {
    Slack,
    Discord { bot_name: String, avatar_url: String },
}

/// POSTs notifications to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    name: String,
    url: String,
    flavor: WebhookFlavor,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(name: impl Into<String>, url: impl Into<String>, flavor: WebhookFlavor, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            flavor,
            client,
        }
    }

    /// Build the JSON body for a notification.
    pub fn payload(&self, notification: &Notification) -> Value {
        match &self.flavor {
            WebhookFlavor::Slack => json!({
                "text": format!("*{}*\n{}", notification.title(), notification.body()),
            }),
            WebhookFlavor::Discord { bot_name, avatar_url } => {
                let mut payload = json!({
                    "embeds": [{
                        "title": notification.title(),
                        "description": notification.body(),
                        "color": discord_color(notification.kind),
                    }],
                });
                if !bot_name.is_empty() {
                    payload["username"] = json!(bot_name);
                }
                if !avatar_url.is_empty() {
                    payload["avatar_url"] = json!(avatar_url);
                }
                payload
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn discord_color(kind: NotificationKind) -> u32 {
    match kind {
        NotificationKind::Alert => 0xE0_1E_5A,
        NotificationKind::Recovery => 0x2E_B6_7D,
        NotificationKind::Report => 0x36_C5_F0,
        NotificationKind::Failover => 0xEC_B2_2E,
    }
}

/// Shared HTTP client for webhook delivery.
pub fn webhook_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
}

fn push_enabled(
    out: &mut Vec<Arc<dyn Notifier>>,
    name: &str,
    hook: &WebhookConfig,
    flavor: WebhookFlavor,
    client: &reqwest::Client,
) {
    if hook.enabled && !hook.webhook.is_empty() {
        out.push(Arc::new(WebhookNotifier::new(name, hook.webhook.clone(), flavor, client.clone())));
    }
}

fn discord_flavor(discord: &DiscordConfig) -> WebhookFlavor {
    WebhookFlavor::Discord {
        bot_name: discord.bot_name.clone(),
        avatar_url: discord.bot_avatar_url.clone(),
    }
}

/// Targets for loss alerts and recoveries.
pub fn alert_notifiers(report: &ReportConfig, client: &reqwest::Client) -> Vec<Arc<dyn Notifier>> {
    let mut out = Vec::new();
    push_enabled(&mut out, "slack-alert", &report.slack.alert, WebhookFlavor::Slack, client);
    push_enabled(&mut out, "discord-alert", &report.discord.alert, discord_flavor(&report.discord), client);
    out
}

/// Targets for periodic summaries.
pub fn report_notifiers(report: &ReportConfig, client: &reqwest::Client) -> Vec<Arc<dyn Notifier>> {
    let mut out = Vec::new();
    push_enabled(&mut out, "slack-report", &report.slack.report, WebhookFlavor::Slack, client);
    push_enabled(&mut out, "discord-report", &report.discord.report, discord_flavor(&report.discord), client);
    out
}

/// Targets for endpoint failover notices.
pub fn failover_notifiers(
    failover: &FailoverConfig,
    discord: &DiscordConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn Notifier>> {
    let mut out = Vec::new();
    push_enabled(&mut out, "slack-failover", &failover.slack_alert, WebhookFlavor::Slack, client);
    push_enabled(&mut out, "discord-failover", &failover.discord_alert, discord_flavor(discord), client);
    out
}
