use serde::Deserialize;

use crate::model::ChatMessage;

/// WhatsApp Cloud API webhook delivery (`entry[].changes[].value.messages[]`).
/// Only the fields this service reads are modelled.
#[derive(Debug, Deserialize, Default)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl WebhookPayload {
    /// Text messages in delivery order. Status callbacks and media messages
    /// carry no `text` and are skipped.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .flat_map(|c| c.value.messages.iter())
            .filter_map(|m| {
                m.text
                    .as_ref()
                    .map(|t| ChatMessage::new(m.from.clone(), t.body.clone()))
            })
            .collect()
    }
}

/// `GET /whatsapp/webhook` query.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

/// The challenge to echo back, if the handshake is valid.
pub fn verify_subscription(query: &VerifyQuery, expected_token: &str) -> Option<String> {
    if expected_token.is_empty() {
        return None;
    }
    match (&query.mode, &query.verify_token, &query.challenge) {
        (Some(mode), Some(token), Some(challenge)) if mode == "subscribe" && token == expected_token => {
            Some(challenge.clone())
        }
        _ => None,
    }
}
