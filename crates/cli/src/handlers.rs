//! Demo handlers so the router can be exercised from the shell.

use async_trait::async_trait;
use shellbot::conversation::{Conversation, TurnHandler};
use shellbot::routing::EventHandler;
use shellbot::{handler_fn, Bot, Event, EventKind, ReplyContext};
use std::sync::Arc;

/// Answers anything addressed to the bot (DMs and direct mentions).
struct Addressed;

#[async_trait]
impl EventHandler for Addressed {
    async fn handle(&self, bot: &Bot, event: Event) {
        let ctx = &event.context;
        let text = event.text().trim();
        let lower = text.to_lowercase();
        let res = if lower == "hello" || lower == "hi" {
            bot.reply(ctx, "Hello.")
        } else if let Some(rest) = text.strip_prefix("type ") {
            let _ = bot.reply_with_typing(ctx, rest.to_string());
            Ok(())
        } else if lower == "ask me" {
            let res = bot.reply(ctx, "What's your name?");
            bot.start_conversation(ctx, Arc::new(AskName)).await;
            res
        } else if lower == "count" {
            bot.reply(ctx, format!("I have sent {} messages.", bot.msgcount()))
        } else {
            bot.reply(ctx, format!("I heard you say: {}", text))
        };
        if let Err(e) = res {
            log::warn!("demo reply failed: {}", e);
        }
    }
}

/// One-question conversation: waits for a name, greets, ends.
struct AskName;

#[async_trait]
impl TurnHandler for AskName {
    async fn on_turn(&self, bot: &Bot, conversation: &Conversation, ctx: ReplyContext) {
        let name = ctx.message.text_or_empty().trim().to_string();
        if name.is_empty() {
            if let Err(e) = bot.reply(&ctx, "I didn't catch that. What's your name?") {
                log::warn!("demo reply failed: {}", e);
            }
            return;
        }
        if let Err(e) = bot.reply(&ctx, format!("Nice to meet you, {}.", name)) {
            log::warn!("demo reply failed: {}", e);
        }
        bot.end_conversation(&conversation.id).await;
    }
}

pub async fn register(bot: &Bot) {
    let addressed: Arc<dyn EventHandler> = Arc::new(Addressed);
    bot.on(EventKind::DirectMessage, addressed.clone()).await;
    bot.on(EventKind::DirectMention, addressed).await;
    bot.on(
        EventKind::Mention,
        handler_fn(|bot: Bot, event: Event| async move {
            let reply = format!("You mentioned me? Start with @{} to talk to me.", bot.identity().name);
            if let Err(e) = bot.reply(&event.context, reply) {
                log::warn!("demo reply failed: {}", e);
            }
        }),
    )
    .await;
}
