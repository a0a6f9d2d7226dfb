// src/services/notifier.rs

//! Chat webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{Config, ReportData, ReportMode};
use crate::pipeline::batch::{BatchPlanner, MessageFormat};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// A delivery channel for planned message batches.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and results.
    fn channel(&self) -> &str;

    /// Markup this channel expects.
    fn format(&self) -> MessageFormat;

    /// Deliver one message.
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
enum Target {
    Feishu { url: String },
    DingTalk { url: String },
    WeWork { url: String },
    Telegram {
        api_base: String,
        token: String,
        chat_id: String,
    },
}

/// Incoming-webhook notifier for the supported chat platforms.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    target: Target,
}

impl WebhookNotifier {
    pub fn feishu(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            target: Target::Feishu { url: url.into() },
        }
    }

    pub fn dingtalk(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            target: Target::DingTalk { url: url.into() },
        }
    }

    pub fn wework(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            target: Target::WeWork { url: url.into() },
        }
    }

    pub fn telegram(client: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            target: Target::Telegram {
                api_base: TELEGRAM_API.to_string(),
                token: token.into(),
                chat_id: chat_id.into(),
            },
        }
    }

    /// Point a Telegram notifier at another Bot API host.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        if let Target::Telegram { api_base, .. } = &mut self.target {
            *api_base = base.into();
        }
        self
    }

    fn endpoint(&self) -> String {
        match &self.target {
            Target::Feishu { url } | Target::DingTalk { url } | Target::WeWork { url } => {
                url.clone()
            }
            Target::Telegram {
                api_base, token, ..
            } => format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
        }
    }

    fn payload(&self, text: &str) -> Value {
        match &self.target {
            Target::Feishu { .. } => json!({
                "msg_type": "text",
                "content": { "text": text },
            }),
            Target::DingTalk { .. } => json!({
                "msgtype": "markdown",
                "markdown": { "title": "Trend report", "text": text },
            }),
            Target::WeWork { .. } => json!({
                "msgtype": "markdown",
                "markdown": { "content": text },
            }),
            Target::Telegram { chat_id, .. } => json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        }
    }

    /// Check the platform's application-level status in the response body.
    ///
    /// Feishu only fails on an explicit non-zero code, so an empty or non-JSON
    /// body after HTTP success counts as delivered. The other platforms must
    /// confirm success in a JSON body.
    fn check_body(&self, body: &Value) -> std::result::Result<(), String> {
        let ok = match &self.target {
            Target::Feishu { .. } => body
                .get("code")
                .or_else(|| body.get("StatusCode"))
                .and_then(Value::as_i64)
                .unwrap_or(0)
                == 0,
            Target::DingTalk { .. } | Target::WeWork { .. } => {
                body.get("errcode").and_then(Value::as_i64) == Some(0)
            }
            Target::Telegram { .. } => body.get("ok").and_then(Value::as_bool) == Some(true),
        };
        if ok {
            return Ok(());
        }
        let message = ["errmsg", "msg", "description"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or("rejected by platform");
        Err(message.to_string())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &str {
        self.format().as_str()
    }

    fn format(&self) -> MessageFormat {
        match self.target {
            Target::Feishu { .. } => MessageFormat::Feishu,
            Target::DingTalk { .. } => MessageFormat::DingTalk,
            Target::WeWork { .. } => MessageFormat::WeWork,
            Target::Telegram { .. } => MessageFormat::Telegram,
        }
    }

    async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&self.payload(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::delivery(self.channel(), format!("HTTP {status}")));
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|e| {
            log::debug!(
                "{} answered with a non-JSON body ({}): {:?}",
                self.channel(),
                e,
                text
            );
            Value::Null
        });
        self.check_body(&body)
            .map_err(|message| AppError::delivery(self.channel(), message))
    }
}

/// Build notifiers for every configured webhook.
pub fn notifiers_from_config(config: &Config, client: &Client) -> Vec<Box<dyn Notifier>> {
    let hooks = &config.notification.webhooks;
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if let Some(url) = &hooks.feishu_url {
        notifiers.push(Box::new(WebhookNotifier::feishu(client.clone(), url)));
    }
    if let Some(url) = &hooks.dingtalk_url {
        notifiers.push(Box::new(WebhookNotifier::dingtalk(client.clone(), url)));
    }
    if let Some(url) = &hooks.wework_url {
        notifiers.push(Box::new(WebhookNotifier::wework(client.clone(), url)));
    }
    if let (Some(token), Some(chat_id)) = (&hooks.telegram_bot_token, &hooks.telegram_chat_id) {
        notifiers.push(Box::new(WebhookNotifier::telegram(
            client.clone(),
            token,
            chat_id,
        )));
    }
    notifiers
}

/// Delivery result of one channel.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub channel: String,
    pub batches: usize,
    pub sent: usize,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.sent == self.batches
    }
}

fn batch_label(format: MessageFormat, index: usize, total: usize) -> String {
    match format {
        MessageFormat::Telegram => format!("<b>[Batch {index}/{total}]</b>\n\n"),
        _ => format!("**[Batch {index}/{total}]**\n\n"),
    }
}

/// Deliver a report to every notifier.
///
/// Channels run independently; a channel stops at its first failed batch.
pub async fn dispatch(
    notifiers: &[Box<dyn Notifier>],
    report: &ReportData,
    config: &Config,
    mode: ReportMode,
    timestamp: &str,
) -> Vec<DeliveryOutcome> {
    let interval = Duration::from_millis(config.notification.batch_interval_ms);

    let deliveries = notifiers.iter().map(|notifier| async move {
        let format = notifier.format();
        let batches = BatchPlanner::from_config(format, config, mode, timestamp)
            .reserve(batch_label(format, 999, 999).len())
            .plan(report);
        let total = batches.len();
        let mut outcome = DeliveryOutcome {
            channel: notifier.channel().to_string(),
            batches: total,
            sent: 0,
            error: None,
        };

        for (i, batch) in batches.iter().enumerate() {
            let text = if total > 1 {
                format!("{}{}", batch_label(format, i + 1, total), batch)
            } else {
                batch.clone()
            };
            log::info!(
                "Sending {} batch {}/{} ({} bytes)",
                outcome.channel,
                i + 1,
                total,
                text.len()
            );

            if let Err(e) = notifier.send(&text).await {
                log::error!("{} batch {}/{} failed: {}", outcome.channel, i + 1, total, e);
                outcome.error = Some(e.to_string());
                break;
            }
            outcome.sent += 1;

            if i + 1 < total && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }

        if outcome.is_success() {
            log::info!("{} delivered {} batch(es)", outcome.channel, outcome.sent);
        }
        outcome
    });

    join_all(deliveries).await
}
