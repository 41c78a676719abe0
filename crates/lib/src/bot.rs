//! The bot handle: identity, router, conversation store and reply dispatcher.
//!
//! Every handler receives a `&Bot`; it is cheap to clone and all clones share state.

use crate::config::BotIdentity;
use crate::conversation::{Conversation, ConversationStore, TurnHandler};
use crate::message::Message;
use crate::reply::{
    DeliveryError, InlineSink, Poster, ReplyContext, ReplyDispatcher, ReplyEnvelope,
    ReplyPayload,
};
use crate::routing::{
    Classified, Classifier, ConversationMatch, ConversationMatcher, Event, EventBus,
    EventHandler, EventKind, RouterError,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Where an inbound message ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Continued an active conversation.
    Conversation(String),
    /// Classified and emitted on the bus; `handled` is the number of handlers that ran.
    Event { kind: EventKind, handled: usize },
}

#[derive(Clone)]
pub struct Bot {
    identity: Arc<BotIdentity>,
    classifier: Arc<Classifier>,
    matcher: Arc<ConversationMatcher>,
    pub conversations: Arc<ConversationStore>,
    pub bus: Arc<EventBus>,
    pub dispatcher: ReplyDispatcher,
}

impl Bot {
    pub fn new(
        identity: BotIdentity,
        sink: Arc<dyn InlineSink>,
        poster: Arc<dyn Poster>,
    ) -> Result<Self, RouterError> {
        Ok(Self {
            classifier: Arc::new(Classifier::new(&identity)?),
            matcher: Arc::new(ConversationMatcher::new(&identity)?),
            identity: Arc::new(identity),
            conversations: Arc::new(ConversationStore::new()),
            bus: Arc::new(EventBus::new()),
            dispatcher: ReplyDispatcher::new(sink, poster),
        })
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub fn classify(&self, message: &Message) -> Classified {
        self.classifier.classify(message)
    }

    /// Active conversation owning `message`'s (user, channel), with the message normalized.
    pub async fn find_conversation(&self, message: &Message) -> Option<ConversationMatch> {
        let conversations = self.conversations.list().await;
        self.matcher.find(message, &conversations)
    }

    pub async fn on(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.bus.on(kind, handler).await
    }

    /// Route one inbound message: an owning conversation gets it first, otherwise it is
    /// classified and emitted to the handlers registered for its kind.
    pub async fn receive(&self, ctx: ReplyContext) -> RouteOutcome {
        log::debug!(
            "received {} from {} in {}",
            ctx.message.kind.as_str(),
            ctx.message.user,
            ctx.message.channel
        );
        if let Some(found) = self.find_conversation(&ctx.message).await {
            let id = found.conversation.id.clone();
            let turn_ctx = ctx.with_message(found.message);
            let snapshot = self
                .conversations
                .record_turn(&id, turn_ctx.message.text_or_empty())
                .await
                .unwrap_or(found.conversation);
            if let Some(handler) = self.conversations.handler(&id).await {
                handler.on_turn(self, &snapshot, turn_ctx).await;
            }
            return RouteOutcome::Conversation(id);
        }

        let Classified { kind, message } = self.classify(&ctx.message);
        log::debug!("classified as {}", kind);
        let event = Event {
            kind,
            original: ctx.message.clone(),
            context: ctx.with_message(message),
        };
        let handled = self.bus.emit(self, event).await;
        RouteOutcome::Event { kind, handled }
    }

    /// Process inbound contexts one at a time, preserving arrival order.
    pub fn spawn_inbound_loop(&self, mut inbound_rx: mpsc::Receiver<ReplyContext>) -> JoinHandle<()> {
        let bot = self.clone();
        tokio::spawn(async move {
            while let Some(ctx) = inbound_rx.recv().await {
                bot.receive(ctx).await;
            }
            log::debug!("inbound channel closed, router loop stopped");
        })
    }

    /// Start a conversation owned by the context message's (user, channel).
    pub async fn start_conversation(
        &self,
        ctx: &ReplyContext,
        handler: Arc<dyn TurnHandler>,
    ) -> Conversation {
        self.conversations.start(ctx.message.clone(), handler).await
    }

    /// Start a conversation with the context message's user in the DM context.
    pub async fn start_private_conversation(
        &self,
        ctx: &ReplyContext,
        handler: Arc<dyn TurnHandler>,
    ) -> Conversation {
        self.conversations.start_private(&ctx.message, handler).await
    }

    pub async fn end_conversation(&self, id: &str) -> bool {
        self.conversations.end(id).await
    }

    /// Inline send of an envelope as-is (`say`).
    pub fn say(&self, envelope: ReplyEnvelope) -> Result<(), DeliveryError> {
        self.dispatcher.send(envelope)
    }

    pub fn reply(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.dispatcher.reply(ctx, payload)
    }

    pub fn reply_public(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.dispatcher.reply_public(ctx, payload)
    }

    pub fn reply_private(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<(), DeliveryError> {
        self.dispatcher.reply_private(ctx, payload)
    }

    pub fn reply_public_delayed(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<JoinHandle<Result<(), DeliveryError>>, DeliveryError> {
        self.dispatcher.reply_public_delayed(ctx, payload)
    }

    pub fn reply_private_delayed(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> Result<JoinHandle<Result<(), DeliveryError>>, DeliveryError> {
        self.dispatcher.reply_private_delayed(ctx, payload)
    }

    pub fn reply_with_typing(
        &self,
        ctx: &ReplyContext,
        payload: impl Into<ReplyPayload>,
    ) -> JoinHandle<Result<(), DeliveryError>> {
        self.dispatcher.reply_with_typing(ctx, payload)
    }

    pub fn start_typing(&self, ctx: &ReplyContext) -> Result<(), DeliveryError> {
        self.dispatcher.start_typing(ctx)
    }

    pub fn msgcount(&self) -> u64 {
        self.dispatcher.msgcount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DM_CHANNEL;
    use crate::routing::handler_fn;
    use async_trait::async_trait;
    use std::sync::Mutex;

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

    fn bot() -> (Bot, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let bot = Bot::new(BotIdentity::default(), sink.clone(), Arc::new(NoPost)).unwrap();
        (bot, sink)
    }

    struct Echo;

    #[async_trait]
    impl TurnHandler for Echo {
        async fn on_turn(&self, bot: &Bot, conversation: &Conversation, ctx: ReplyContext) {
            let _ = bot.reply(
                &ctx,
                format!("turn {}: {}", conversation.turns.len(), ctx.message.text_or_empty()),
            );
        }
    }

    #[tokio::test]
    async fn unowned_message_is_emitted_by_kind() {
        let (bot, sink) = bot();
        bot.on(
            EventKind::DirectMention,
            handler_fn(|bot: Bot, event: Event| async move {
                let _ = bot.reply(&event.context, format!("you said {}", event.text()));
            }),
        )
        .await;
        let outcome = bot
            .receive(ReplyContext::new(Message::text("##", "alice", "@ShellBot: hello")))
            .await;
        assert_eq!(
            outcome,
            RouteOutcome::Event {
                kind: EventKind::DirectMention,
                handled: 1
            }
        );
        assert_eq!(*sink.0.lock().unwrap(), vec!["you said hello"]);
    }

    #[tokio::test]
    async fn event_keeps_original_message() {
        let (bot, _) = bot();
        let seen = Arc::new(Mutex::new(None));
        let seen_in = seen.clone();
        bot.on(
            EventKind::DirectMention,
            handler_fn(move |_bot: Bot, event: Event| {
                let seen = seen_in.clone();
                async move {
                    *seen.lock().unwrap() = Some(event);
                }
            }),
        )
        .await;
        bot.receive(ReplyContext::new(Message::text("##", "alice", "@shellbot go")))
            .await;
        let event = seen.lock().unwrap().take().unwrap();
        assert_eq!(event.original.text.as_deref(), Some("@shellbot go"));
        assert_eq!(event.text(), "go");
    }

    #[tokio::test]
    async fn unhandled_kind_reports_zero() {
        let (bot, _) = bot();
        let outcome = bot
            .receive(ReplyContext::new(Message::text("##", "alice", "nobody listens")))
            .await;
        assert_eq!(
            outcome,
            RouteOutcome::Event {
                kind: EventKind::Ambient,
                handled: 0
            }
        );
    }

    #[tokio::test]
    async fn conversation_takes_precedence_over_events() {
        let (bot, sink) = bot();
        bot.on(
            EventKind::DirectMessage,
            handler_fn(|bot: Bot, event: Event| async move {
                let _ = bot.reply(&event.context, "event handler");
            }),
        )
        .await;
        let start = ReplyContext::new(Message::text(DM_CHANNEL, "alice", "start"));
        let convo = bot.start_conversation(&start, Arc::new(Echo)).await;

        let outcome = bot
            .receive(ReplyContext::new(Message::text(DM_CHANNEL, "alice", "<@shellbot>: first")))
            .await;
        assert_eq!(outcome, RouteOutcome::Conversation(convo.id.clone()));
        bot.receive(ReplyContext::new(Message::text(DM_CHANNEL, "alice", "second")))
            .await;
        assert_eq!(*sink.0.lock().unwrap(), vec!["turn 1: first", "turn 2: second"]);

        let other = bot
            .receive(ReplyContext::new(Message::text(DM_CHANNEL, "bob", "hi")))
            .await;
        assert!(matches!(other, RouteOutcome::Event { kind: EventKind::DirectMessage, .. }));

        assert!(bot.end_conversation(&convo.id).await);
        let after = bot
            .receive(ReplyContext::new(Message::text(DM_CHANNEL, "alice", "third")))
            .await;
        assert!(matches!(after, RouteOutcome::Event { kind: EventKind::DirectMessage, .. }));
    }

    #[tokio::test]
    async fn inbound_loop_preserves_order() {
        let (bot, sink) = bot();
        bot.on(
            EventKind::Ambient,
            handler_fn(|bot: Bot, event: Event| async move {
                let _ = bot.reply(&event.context, event.text().to_string());
            }),
        )
        .await;
        let (tx, rx) = mpsc::channel(8);
        let handle = bot.spawn_inbound_loop(rx);
        for i in 0..5 {
            tx.send(ReplyContext::new(Message::text("##", "alice", format!("m{}", i))))
                .await
                .unwrap();
        }
        drop(tx);
        handle.await.unwrap();
        assert_eq!(*sink.0.lock().unwrap(), vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn private_conversation_takes_the_next_dm_turn() {
        let (bot, sink) = bot();
        let start = ReplyContext::new(Message::text("##", "alice", "@ShellBot: quietly"));
        let convo = bot.start_private_conversation(&start, Arc::new(Echo)).await;
        assert_eq!(convo.source_message.channel, DM_CHANNEL);

        let public = bot
            .receive(ReplyContext::new(Message::text("##", "alice", "not here")))
            .await;
        assert!(matches!(public, RouteOutcome::Event { kind: EventKind::Ambient, .. }));

        let outcome = bot
            .receive(ReplyContext::new(Message::text(DM_CHANNEL, "alice", "secret")))
            .await;
        assert_eq!(outcome, RouteOutcome::Conversation(convo.id));
        assert_eq!(*sink.0.lock().unwrap(), vec!["turn 1: secret"]);
    }

    #[test]
    fn say_sends_envelope_as_is_and_counts() {
        let (bot, sink) = bot();
        bot.say(ReplyEnvelope {
            channel: "#ops".to_string(),
            ..ReplyEnvelope::text("deploy done")
        })
        .unwrap();
        bot.say(ReplyEnvelope {
            channel: "#ops".to_string(),
            username: Some("Deployer".to_string()),
            ..ReplyEnvelope::text("rolled back")
        })
        .unwrap();
        assert_eq!(bot.msgcount(), 2);

        let sent = sink.0.lock().unwrap();
        assert_eq!(sent[0], "deploy done");
        let v: serde_json::Value = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(v["channel"], "#ops");
        assert_eq!(v["username"], "Deployer");
        assert_eq!(v["as_user"], false);
    }

    #[derive(Default)]
    struct SlowPoster(Mutex<Vec<serde_json::Value>>);

    #[async_trait]
    impl Poster for SlowPoster {
        async fn post(&self, _url: &str, body: &serde_json::Value) -> Result<(), DeliveryError> {
            tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
            self.0.lock().unwrap().push(body.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_does_not_hold_up_routing() {
        let poster = Arc::new(SlowPoster::default());
        let bot = Bot::new(
            BotIdentity::default(),
            Arc::new(RecordingSink::default()),
            poster.clone(),
        )
        .unwrap();
        let pending = Arc::new(Mutex::new(None));
        let pending_in = pending.clone();
        bot.on(
            EventKind::Ambient,
            handler_fn(move |bot: Bot, event: Event| {
                let pending = pending_in.clone();
                async move {
                    let handle = bot.reply_public_delayed(&event.context, "later").unwrap();
                    *pending.lock().unwrap() = Some(handle);
                }
            }),
        )
        .await;

        let started = tokio::time::Instant::now();
        let msg = Message::new(crate::message::MessageKind::SlashCommand, "##", "alice")
            .with_text("slow job")
            .with_response_target("http://hook/1");
        bot.receive(ReplyContext::new(msg)).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(1500));
        assert!(poster.0.lock().unwrap().is_empty());

        let handle = pending.lock().unwrap().take().unwrap();
        handle.await.unwrap().unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(1500));
        assert_eq!(poster.0.lock().unwrap()[0]["text"], "later");
    }
}
