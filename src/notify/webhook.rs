// src/notify/webhook.rs
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::format_digest;
use crate::feed::types::Telegram;
use crate::timeutil;

const REPORT_TYPE: &str = "财联社电报";

/// Best-effort webhook delivery of the newly archived items. One POST, no
/// retry; any failure is logged and swallowed so the pipeline never blocks
/// on notification problems.
pub struct WebhookNotifier {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct WebhookPayload {
    content: WebhookContent,
}

#[derive(Serialize)]
struct WebhookContent {
    text: String,
    total_titles: usize,
    timestamp: String,
    report_type: &'static str,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout,
        }
    }

    pub async fn notify(&self, new_items: &[Telegram]) {
        let Some(url) = &self.webhook_url else {
            tracing::info!("webhook disabled (no CLS_WEBHOOK_URL), skipping notification");
            return;
        };
        if new_items.is_empty() {
            tracing::info!("no new telegrams, nothing to notify");
            return;
        }

        let payload = WebhookPayload {
            content: WebhookContent {
                text: format_digest(new_items),
                total_titles: new_items.len(),
                timestamp: timeutil::format_datetime(&timeutil::now_beijing()),
                report_type: REPORT_TYPE,
            },
        };

        tracing::info!(count = new_items.len(), "sending webhook notification");
        let result = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(rsp) if rsp.status().is_success() => {
                tracing::info!("webhook delivered");
            }
            Ok(rsp) => {
                tracing::warn!(status = %rsp.status(), "webhook rejected");
            }
            Err(e) => {
                tracing::warn!(error = ?e, "webhook request failed");
            }
        }
    }
}
