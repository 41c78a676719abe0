//! Typing simulation: a typing notification now, the reply after a length-based delay.

use crate::reply::{DeliveryError, ReplyContext, ReplyDispatcher, ReplyPayload};
use std::time::Duration;
use tokio::task::JoinHandle;

/// 1200 characters per minute.
const MS_PER_CHAR: u64 = 1200 / 60;
const MAX_TYPING_DELAY_MS: u64 = 2000;

/// How long a human would take to type `text`, capped at two seconds.
pub fn typing_delay(text: &str) -> Duration {
    let chars = text.chars().count() as u64;
    Duration::from_millis(chars.saturating_mul(MS_PER_CHAR).min(MAX_TYPING_DELAY_MS))
}

impl ReplyDispatcher {
    /// Send a typing notification immediately, then reply inline once the typing delay
    /// has elapsed. The deferred reply cannot be cancelled; the handle yields its outcome.
    /// Must be called from within a tokio runtime.
    pub fn reply_with_typing(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> JoinHandle<Result<(), DeliveryError>> {
        let payload = payload.into();
        let delay = typing_delay(payload.text());
        if let Err(e) = self.start_typing(ctx) {
            log::debug!("typing notification failed: {}", e);
        }
        let dispatcher = self.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.reply(&ctx, payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::reply::{InlineSink, Poster, ReplyEnvelope};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[test]
    fn short_text_delay_is_proportional() {
        assert_eq!(typing_delay("hi"), Duration::from_millis(40));
        assert_eq!(typing_delay(""), Duration::ZERO);
    }

    #[test]
    fn long_text_delay_is_capped() {
        assert_eq!(typing_delay(&"x".repeat(200)), Duration::from_millis(2000));
        assert_eq!(typing_delay(&"x".repeat(5000)), Duration::from_millis(2000));
        assert_eq!(typing_delay(&"x".repeat(99)), Duration::from_millis(1980));
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl InlineSink for RecordingSink {
        fn write(&self, rendered: &str) -> Result<(), DeliveryError> {
            self.0.lock().unwrap().push(rendered.to_string());
            Ok(())
        }
    }

    struct NoPost;

    #[async_trait]
    impl Poster for NoPost {
        async fn post(&self, _url: &str, _body: &serde_json::Value) -> Result<(), DeliveryError> {
            Err(DeliveryError::Transport("unused".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn typing_first_then_reply_after_delay() {
        let sink = Arc::new(RecordingSink::default());
        let d = ReplyDispatcher::new(sink.clone(), Arc::new(NoPost));
        let ctx = ReplyContext::new(Message::text("##", "u", "hello"));

        let started = tokio::time::Instant::now();
        let handle = d.reply_with_typing(&ctx, "hi");
        assert_eq!(*sink.0.lock().unwrap(), vec!["..."]);

        handle.await.unwrap().unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(40) && waited < Duration::from_millis(45));
        assert_eq!(*sink.0.lock().unwrap(), vec!["...", "hi"]);
        assert_eq!(d.msgcount(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn envelope_payload_uses_its_text_for_delay() {
        let sink = Arc::new(RecordingSink::default());
        let d = ReplyDispatcher::new(sink.clone(), Arc::new(NoPost));
        let ctx = ReplyContext::new(Message::text("##", "u", "hello"));

        let started = tokio::time::Instant::now();
        let long = "y".repeat(250);
        d.reply_with_typing(&ctx, ReplyEnvelope::text(long.clone()))
            .await
            .unwrap()
            .unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2000) && waited < Duration::from_millis(2005));
        assert_eq!(sink.0.lock().unwrap()[1], long);
    }
}
