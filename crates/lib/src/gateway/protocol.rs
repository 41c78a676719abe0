//! Wire types for the webserver: slash command and outgoing webhook forms, health payload,
//! and the one-shot responder that binds a reply to the HTTP request.

use crate::message::{Message, MessageKind};
use crate::reply::{DeliveryError, ReplyEnvelope, WebResponder};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Slash command POST body (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    /// Where delayed replies go.
    #[serde(default)]
    pub response_url: Option<String>,
}

impl SlashCommandForm {
    pub fn into_message(self) -> Message {
        let mut message =
            Message::new(MessageKind::SlashCommand, self.channel_id, self.user_id).with_text(self.text);
        if let Some(url) = self.response_url.filter(|u| !u.trim().is_empty()) {
            message = message.with_response_target(url);
        }
        message
    }
}

/// Outgoing webhook POST body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookForm {
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub trigger_word: Option<String>,
}

impl WebhookForm {
    pub fn into_message(self) -> Message {
        Message::new(MessageKind::OutgoingWebhook, self.channel_id, self.user_id).with_text(self.text)
    }
}

/// `GET /` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub runtime: String,
    pub bot: String,
    pub port: u16,
}

/// Web response bound to one request. The first envelope wins; later calls fail
/// because the response is no longer live.
pub struct OneshotResponder {
    tx: Mutex<Option<oneshot::Sender<ReplyEnvelope>>>,
}

impl OneshotResponder {
    pub fn new() -> (Self, oneshot::Receiver<ReplyEnvelope>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

impl WebResponder for OneshotResponder {
    fn respond(&self, envelope: &ReplyEnvelope) -> Result<(), DeliveryError> {
        let tx = self.tx.lock().ok().and_then(|mut g| g.take());
        match tx {
            Some(tx) => tx
                .send(envelope.clone())
                .map_err(|_| DeliveryError::NoResponseChannel),
            None => Err(DeliveryError::NoResponseChannel),
        }
    }
}
