//! Event bus: handlers registered per event kind, run in registration order.

use crate::bot::Bot;
use crate::message::Message;
use crate::reply::ReplyContext;
use crate::routing::EventKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A classified inbound message as seen by handlers.
#[derive(Clone)]
pub struct Event {
    pub kind: EventKind,
    /// The message as received, before addressing tokens were stripped.
    pub original: Message,
    /// Normalized message plus whatever delivery context the transport bound.
    pub context: ReplyContext,
}

impl Event {
    /// Normalized text, empty when the message carried none.
    pub fn text(&self) -> &str {
        self.context.message.text_or_empty()
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, bot: &Bot, event: Event);
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Bot, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, bot: &Bot, event: Event) {
        (self.0)(bot.clone(), event).await
    }
}

/// Adapt an async closure into an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Bot, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Registry of handlers keyed by event kind.
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn on(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Run every handler for `event.kind`. Returns how many handlers ran.
    pub async fn emit(&self, bot: &Bot, event: Event) -> usize {
        // Clone the list so handlers may register more handlers without deadlocking.
        let handlers = self
            .handlers
            .read()
            .await
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();
        if handlers.is_empty() {
            log::debug!("no handler for {} event", event.kind);
        }
        for h in &handlers {
            h.handle(bot, event.clone()).await;
        }
        handlers.len()
    }
}
