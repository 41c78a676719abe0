//! Outbound replies: envelope composition, delivery strategies and typing simulation.
//!
//! Which strategy a handler can use depends on the context the inbound message came with:
//! inline replies always work; immediate web replies need a responder bound to the HTTP
//! request; delayed replies need the message's callback URL.

mod dispatch;
mod envelope;
mod sink;
mod typing;

pub use dispatch::ReplyDispatcher;
pub use envelope::{compose, EnvelopeKind, ReplyEnvelope, ReplyPayload, ResponseType};
pub use sink::{render_inline, ConsoleSink, HttpPoster, InlineSink, Poster, WebResponder};
pub use typing::typing_delay;

use crate::message::Message;
use std::sync::Arc;

/// Why a reply could not be delivered. Degrades one reply, never the router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("no web response object bound to this message")]
    NoResponseChannel,
    #[error("no response target (callback url) on this message")]
    NoResponseTarget,
    #[error("delivery transport failed: {0}")]
    Transport(String),
    #[error("inline sink unavailable: {0}")]
    Sink(String),
}

/// Delivery context for one inbound message: the (normalized) message plus the web
/// response bound to its request, if any. Passed explicitly to every reply call.
#[derive(Clone)]
pub struct ReplyContext {
    pub message: Message,
    pub responder: Option<Arc<dyn WebResponder>>,
}

impl ReplyContext {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            responder: None,
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn WebResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Same delivery context around a different (e.g. normalized) message.
    pub fn with_message(&self, message: Message) -> Self {
        Self {
            message,
            responder: self.responder.clone(),
        }
    }
}

impl std::fmt::Debug for ReplyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyContext")
            .field("message", &self.message)
            .field("responder", &self.responder.is_some())
            .finish()
    }
}
