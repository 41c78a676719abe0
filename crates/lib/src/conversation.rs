//! Multi-turn conversations and the in-memory store that owns them.
//!
//! A conversation belongs to exactly one (user, channel) pair. The store keeps
//! conversations in insertion order and guarantees at most one active conversation
//! per pair; the matcher only reads snapshots from it.

use crate::bot::Bot;
use crate::message::{Message, DM_CHANNEL};
use crate::reply::ReplyContext;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Unique conversation identifier (opaque string).
pub type ConversationId = String;

/// Snapshot of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    /// The message that started the conversation; fixes its (user, channel) pair.
    pub source_message: Message,
    pub active: bool,
    /// Normalized text of each follow-up turn, oldest first.
    pub turns: Vec<String>,
}

impl Conversation {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when `message` comes from this conversation's user in this conversation's channel.
    pub fn owns(&self, message: &Message) -> bool {
        self.source_message.user == message.user && self.source_message.channel == message.channel
    }
}

/// Receives the follow-up turns routed into a conversation.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// `conversation` already includes this turn in `turns`; `context.message` holds the normalized text.
    async fn on_turn(&self, bot: &Bot, conversation: &Conversation, context: ReplyContext);
}

struct Entry {
    conversation: Conversation,
    handler: Arc<dyn TurnHandler>,
}

/// In-memory conversation engine (start, end, list, record turns).
pub struct ConversationStore {
    inner: Arc<RwLock<Vec<Entry>>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start a conversation owned by `source`'s (user, channel). Any active conversation for the
    /// same pair is ended first, and previously ended conversations are dropped.
    pub async fn start(&self, source: Message, handler: Arc<dyn TurnHandler>) -> Conversation {
        let conversation = Conversation {
            id: format!("convo-{}", uuid::Uuid::new_v4()),
            source_message: source,
            active: true,
            turns: Vec::new(),
        };
        let mut g = self.inner.write().await;
        for e in g.iter_mut() {
            if e.conversation.active && e.conversation.owns(&conversation.source_message) {
                log::debug!(
                    "conversation {} replaced by a new one for {}/{}",
                    e.conversation.id,
                    conversation.source_message.user,
                    conversation.source_message.channel
                );
                e.conversation.active = false;
            }
        }
        g.retain(|e| e.conversation.active);
        g.push(Entry {
            conversation: conversation.clone(),
            handler,
        });
        conversation
    }

    /// Start a conversation with `source.user` in the DM context.
    pub async fn start_private(
        &self,
        source: &Message,
        handler: Arc<dyn TurnHandler>,
    ) -> Conversation {
        let mut dm = source.clone();
        dm.channel = DM_CHANNEL.to_string();
        self.start(dm, handler).await
    }

    /// Mark a conversation inactive. Returns false if the id is unknown or already ended.
    pub async fn end(&self, id: &str) -> bool {
        let mut g = self.inner.write().await;
        match g.iter_mut().find(|e| e.conversation.id == id) {
            Some(e) if e.conversation.active => {
                e.conversation.active = false;
                true
            }
            _ => false,
        }
    }

    /// Snapshot of every known conversation in insertion order (oldest first).
    pub async fn list(&self) -> Vec<Conversation> {
        self.inner
            .read()
            .await
            .iter()
            .map(|e| e.conversation.clone())
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        self.inner
            .read()
            .await
            .iter()
            .find(|e| e.conversation.id == id)
            .map(|e| e.conversation.clone())
    }

    pub async fn handler(&self, id: &str) -> Option<Arc<dyn TurnHandler>> {
        self.inner
            .read()
            .await
            .iter()
            .find(|e| e.conversation.id == id)
            .map(|e| e.handler.clone())
    }

    /// Append a turn; returns the updated snapshot, or None if the conversation is unknown.
    pub async fn record_turn(&self, id: &str, text: impl Into<String>) -> Option<Conversation> {
        let mut g = self.inner.write().await;
        let e = g.iter_mut().find(|e| e.conversation.id == id)?;
        e.conversation.turns.push(text.into());
        Some(e.conversation.clone())
    }
}
