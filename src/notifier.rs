use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// No response at all (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Messaging provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Request build error: {0}")]
    Request(String),
}

/// Delivers a text reply to a chat identity.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// Fire-and-forget delivery: failures are logged and counted, never
/// returned. The trade outcome is already decided when this runs.
pub async fn deliver(notifier: &dyn Notifier, recipient: &str, text: &str) {
    match notifier.send(recipient, text).await {
        Ok(()) => debug!(recipient, "Reply delivered"),
        Err(e) => {
            metrics::inc_notify_failures();
            warn!(recipient, error = %e, "⚠️ Failed to deliver chat reply");
        }
    }
}

/// WhatsApp Cloud API text sender.
pub struct WhatsAppNotifier {
    client: Client,
    messages_url: String,
    token: String,
}

impl WhatsAppNotifier {
    pub fn new(api_url: &str, phone_id: &str, token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        Ok(Self {
            client,
            messages_url: format!("{}/{}/messages", api_url.trim_end_matches('/'), phone_id),
            token: token.to_string(),
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

pub(crate) fn text_message_body(recipient: &str, text: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": recipient,
        "type": "text",
        "text": {
            "preview_url": false,
            "body": text,
        }
    })
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.token)
            .json(&text_message_body(recipient, text))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        // Body is drained on both branches; an unreadable body is only a log line.
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(recipient, response = %body, "WhatsApp send accepted");
        Ok(())
    }
}

/// Used when no messaging provider is configured: replies go to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        info!(recipient, reply = text, "Chat reply (no messaging provider configured)");
        Ok(())
    }
}
