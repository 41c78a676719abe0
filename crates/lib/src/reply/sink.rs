//! Transport seams used by the dispatcher: inline sink, bound web response, outbound POST.

use crate::reply::{DeliveryError, EnvelopeKind, ReplyEnvelope};
use async_trait::async_trait;

/// Synchronous output every inline reply goes through (the shell's stdout, a log, ...).
pub trait InlineSink: Send + Sync {
    fn write(&self, rendered: &str) -> Result<(), DeliveryError>;
}

/// A live response bound to the HTTP request that produced the inbound message.
pub trait WebResponder: Send + Sync {
    fn respond(&self, envelope: &ReplyEnvelope) -> Result<(), DeliveryError>;
}

/// Outbound POST of a JSON body, used for delayed replies.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<(), DeliveryError>;
}

/// Render an envelope for the inline sink: plain text, or pretty JSON when the
/// envelope carries attachments or identity overrides.
pub fn render_inline(envelope: &ReplyEnvelope) -> String {
    if envelope.kind == EnvelopeKind::Typing {
        return "...".to_string();
    }
    if envelope.attachments.is_some() || envelope.has_identity_override() {
        serde_json::to_string_pretty(envelope)
            .unwrap_or_else(|_| envelope.text.clone().unwrap_or_default())
    } else {
        envelope.text.clone().unwrap_or_default()
    }
}

/// Writes rendered replies to stdout, one per line.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl InlineSink for ConsoleSink {
    fn write(&self, rendered: &str) -> Result<(), DeliveryError> {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        writeln!(out, "\r{}", rendered)
            .and_then(|_| out.flush())
            .map_err(|e| DeliveryError::Sink(e.to_string()))
    }
}

/// reqwest-backed poster. Non-2xx responses count as transport failures.
#[derive(Clone, Default)]
pub struct HttpPoster {
    client: reqwest::Client,
}

impl HttpPoster {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Poster for HttpPoster {
    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<(), DeliveryError> {
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Transport(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_renders_as_text() {
        assert_eq!(render_inline(&ReplyEnvelope::text("hello")), "hello");
    }

    #[test]
    fn overrides_render_as_json() {
        let e = ReplyEnvelope {
            username: Some("Robo".to_string()),
            ..ReplyEnvelope::text("hello")
        };
        let rendered = render_inline(&e);
        let v: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(v["username"], "Robo");
        assert_eq!(v["text"], "hello");
    }

    #[test]
    fn typing_renders_as_ellipsis() {
        assert_eq!(render_inline(&ReplyEnvelope::typing()), "...");
    }
}
