//! Webhook delivery against a local receiver.

use chrono::Utc;
use std::sync::Arc;

use rpc_pinger::notify::{self, Notification, Notifier, NotifyError, WebhookFlavor, WebhookNotifier};
use rpc_pinger::report::ReportWindow;

mod common;

fn alert() -> Notification {
    let now = Utc::now();
    let window = ReportWindow::new("mainnet", now - chrono::Duration::minutes(10), now, 20, 8);
    Notification::alert(&window, Some("http://rpc-a".into()), 0.25)
}

#[tokio::test]
async fn test_slack_and_discord_both_delivered() {
    let (slack_addr, slack_bodies) = common::start_webhook_receiver(200).await;
    let (discord_addr, discord_bodies) = common::start_webhook_receiver(204).await;
    let client = reqwest::Client::new();

    let notifiers: Vec<Arc<dyn Notifier>> = vec![
        Arc::new(WebhookNotifier::new(
            "slack-alert",
            format!("http://{}/hook", slack_addr),
            WebhookFlavor::Slack,
            client.clone(),
        )),
        Arc::new(WebhookNotifier::new(
            "discord-alert",
            format!("http://{}/hook", discord_addr),
            WebhookFlavor::Discord {
                bot_name: "pinger".into(),
                avatar_url: String::new(),
            },
            client,
        )),
    ];

    notify::dispatch(&notifiers, &alert()).await;

    let slack: serde_json::Value = serde_json::from_str(&slack_bodies.lock().unwrap()[0]).unwrap();
    assert!(slack["text"].as_str().unwrap().contains("[mainnet] ALERT"));
    assert!(slack["text"].as_str().unwrap().contains("loss: 40.00%"));

    let discord: serde_json::Value = serde_json::from_str(&discord_bodies.lock().unwrap()[0]).unwrap();
    assert_eq!(discord["username"], "pinger");
    assert!(discord["embeds"][0]["description"].as_str().unwrap().contains("http://rpc-a"));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (addr, _) = common::start_webhook_receiver(500).await;
    let notifier = WebhookNotifier::new(
        "slack-alert",
        format!("http://{}/hook", addr),
        WebhookFlavor::Slack,
        reqwest::Client::new(),
    );

    let err = notifier.send(&alert()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Status(500)));
}
