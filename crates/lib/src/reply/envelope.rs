//! Outbound envelope and the composer that builds it from a reply payload.

use crate::message::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    #[default]
    Message,
    Typing,
}

/// Visibility of a web response: the whole channel or only the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// Wire shape of an outbound message (snake_case keys; absent fields omitted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(rename = "type", default)]
    pub kind: EnvelopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_user: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_names: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfurl_links: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfurl_media: Option<bool>,
}

impl ReplyEnvelope {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn typing() -> Self {
        Self {
            kind: EnvelopeKind::Typing,
            ..Self::default()
        }
    }

    /// True when the envelope overrides the bot's name or icon.
    pub fn has_identity_override(&self) -> bool {
        self.icon_url.is_some() || self.icon_emoji.is_some() || self.username.is_some()
    }

    /// Overrides force `as_user = false`; otherwise `as_user` defaults to true.
    pub fn resolve_as_user(&mut self) {
        self.as_user = if self.has_identity_override() {
            Some(false)
        } else {
            Some(self.as_user.unwrap_or(true))
        };
    }
}

/// What a handler hands to a reply method: plain text or a full envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    Text(String),
    Envelope(ReplyEnvelope),
}

impl ReplyPayload {
    pub fn text(&self) -> &str {
        match self {
            ReplyPayload::Text(t) => t,
            ReplyPayload::Envelope(e) => e.text.as_deref().unwrap_or(""),
        }
    }
}

impl From<&str> for ReplyPayload {
    fn from(s: &str) -> Self {
        ReplyPayload::Text(s.to_string())
    }
}

impl From<String> for ReplyPayload {
    fn from(s: String) -> Self {
        ReplyPayload::Text(s)
    }
}

impl From<ReplyEnvelope> for ReplyPayload {
    fn from(e: ReplyEnvelope) -> Self {
        ReplyPayload::Envelope(e)
    }
}

/// Build the envelope for a reply to `source`. The channel always comes from `source`,
/// whatever the payload carried.
pub fn compose(payload: ReplyPayload, source: &Message) -> ReplyEnvelope {
    let mut envelope = match payload {
        ReplyPayload::Text(text) => ReplyEnvelope::text(text),
        ReplyPayload::Envelope(e) => e,
    };
    envelope.channel = source.channel.clone();
    envelope
}
