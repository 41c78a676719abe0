//! Reply dispatcher: inline, immediate web response, and delayed callback delivery.

use crate::reply::envelope::compose;
use crate::reply::{
    render_inline, DeliveryError, InlineSink, Poster, ReplyContext, ReplyEnvelope, ReplyPayload,
    ResponseType,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

struct Inner {
    sink: Arc<dyn InlineSink>,
    poster: Arc<dyn Poster>,
    sent: AtomicU64,
}

/// Chooses and executes a delivery strategy. Cheap to clone; clones share the sink,
/// the poster and the message counter.
#[derive(Clone)]
pub struct ReplyDispatcher {
    inner: Arc<Inner>,
}

impl ReplyDispatcher {
    pub fn new(sink: Arc<dyn InlineSink>, poster: Arc<dyn Poster>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                poster,
                sent: AtomicU64::new(0),
            }),
        }
    }

    /// Number of inline sends so far (operator bookkeeping only).
    pub fn msgcount(&self) -> u64 {
        self.inner.sent.load(Ordering::Relaxed)
    }

    /// Inline send of a ready envelope. Counts the send, then writes to the sink.
    pub fn send(&self, mut envelope: ReplyEnvelope) -> Result<(), DeliveryError> {
        envelope.resolve_as_user();
        log::debug!("say {:?}", envelope);
        self.inner.sent.fetch_add(1, Ordering::Relaxed);
        let res = self.inner.sink.write(&render_inline(&envelope));
        if let Err(ref e) = res {
            log::warn!("inline reply to {} failed: {}", envelope.channel, e);
        }
        res
    }

    /// Inline reply in the source message's channel.
    pub fn reply(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.send(compose(payload.into(), &ctx.message))
    }

    /// Send a typing notification to the source channel.
    pub fn start_typing(&self, ctx: &ReplyContext) -> Result<(), DeliveryError> {
        self.reply(ctx, ReplyEnvelope::typing())
    }

    /// Immediate web response visible to the whole channel.
    pub fn reply_public(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.respond(ctx, payload.into(), ResponseType::InChannel)
    }

    /// Immediate web response visible only to the requesting user.
    pub fn reply_private(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.respond(ctx, payload.into(), ResponseType::Ephemeral)
    }

    /// Delayed reply POSTed to the source message's callback URL, visible to the channel.
    /// The POST runs on its own task; the handle yields its outcome.
    pub fn reply_public_delayed(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<JoinHandle<Result<(), DeliveryError>>, DeliveryError> {
        self.post_delayed(ctx, payload.into(), ResponseType::InChannel)
    }

    /// Delayed reply POSTed to the source message's callback URL, visible only to the user.
    pub fn reply_private_delayed(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<JoinHandle<Result<(), DeliveryError>>, DeliveryError> {
        self.post_delayed(ctx, payload.into(), ResponseType::Ephemeral)
    }

    fn respond(
        &self,
        ctx: &ReplyContext,
        payload: ReplyPayload,
        response_type: ResponseType,
    ) -> Result<(), DeliveryError> {
        let Some(responder) = ctx.responder.as_ref() else {
            log::warn!("no web response bound for reply in {}", ctx.message.channel);
            return Err(DeliveryError::NoResponseChannel);
        };
        let mut envelope = compose(payload, &ctx.message);
        envelope.response_type = Some(response_type);
        envelope.resolve_as_user();
        let res = responder.respond(&envelope);
        if let Err(ref e) = res {
            log::warn!("web response in {} failed: {}", ctx.message.channel, e);
        }
        res
    }

    /// Fails up front without a callback URL; otherwise spawns a single POST.
    fn post_delayed(
        &self,
        ctx: &ReplyContext,
        payload: ReplyPayload,
        response_type: ResponseType,
    ) -> Result<JoinHandle<Result<(), DeliveryError>>, DeliveryError> {
        let Some(url) = ctx.message.response_target.clone() else {
            log::warn!("no response target for delayed reply in {}", ctx.message.channel);
            return Err(DeliveryError::NoResponseTarget);
        };
        let mut envelope = compose(payload, &ctx.message);
        envelope.response_type = Some(response_type);
        envelope.resolve_as_user();
        let body = serde_json::to_value(&envelope)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let poster = self.inner.poster.clone();
        Ok(tokio::spawn(async move {
            let res = poster.post(&url, &body).await;
            if let Err(ref e) = res {
                log::error!("error sending delayed response to {}: {}", url, e);
            }
            res
        }))
    }
}
