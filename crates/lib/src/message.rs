//! Inbound message model: what a transport (shell, slash command, webhook) hands to the router.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Channel name that marks a direct-message context.
pub const DM_CHANNEL: &str = "DM";

/// How a message entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    SlashCommand,
    OutgoingWebhook,
    Typing,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::SlashCommand => "slash_command",
            MessageKind::OutgoingWebhook => "outgoing_webhook",
            MessageKind::Typing => "typing",
        }
    }

    /// Kinds that can continue an in-progress conversation.
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            MessageKind::Message | MessageKind::SlashCommand | MessageKind::OutgoingWebhook
        )
    }
}

/// A unit of inbound communication. Normalization never mutates a message; it returns a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub channel: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Unix ms, strictly increasing across the process.
    pub timestamp: i64,
    /// Callback URL for delayed replies (e.g. a slash command's response_url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_target: Option<String>,
}

impl Message {
    pub fn new(kind: MessageKind, channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            kind,
            channel: channel.into(),
            user: user.into(),
            text: None,
            timestamp: next_timestamp(),
            response_target: None,
        }
    }

    /// Plain text message, the shape the shell produces.
    pub fn text(
        channel: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(MessageKind::Message, channel, user).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_response_target(mut self, url: impl Into<String>) -> Self {
        self.response_target = Some(url.into());
        self
    }

    /// Copy of this message carrying `text`; everything else, timestamp included, is kept.
    pub fn rewritten(&self, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..self.clone()
        }
    }

    pub fn is_direct(&self) -> bool {
        self.channel == DM_CHANNEL
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Wall-clock ms, bumped by one whenever the clock has not moved since the last call.
fn next_timestamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let prev = LAST_TIMESTAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(prev + 1)
}
