//! Find the active conversation that owns an inbound message's (user, channel) pair.
//!
//! On a match the text is normalized with the bot's *identifier* token (`<@id>` or `@id`),
//! unlike the classifier, which strips the display *name*. Users inside a conversation
//! often keep addressing the bot by id out of habit.

use crate::config::BotIdentity;
use crate::conversation::Conversation;
use crate::message::Message;
use regex::{Regex, RegexBuilder};

/// A conversation that owns the message, plus the message with its text normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMatch {
    pub conversation: Conversation,
    pub message: Message,
}

/// Matcher bound to one bot identifier.
pub struct ConversationMatcher {
    id_token: Regex,
}

impl ConversationMatcher {
    pub fn new(identity: &BotIdentity) -> Result<Self, regex::Error> {
        let id = regex::escape(&identity.id);
        // `@id` must not be the prefix of a longer handle.
        let boundary = if identity.id.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let id_token = RegexBuilder::new(&format!("<@{id}>|@{id}{boundary}", id = id, boundary = boundary))
            .case_insensitive(true)
            .build()?;
        Ok(Self { id_token })
    }

    /// First active conversation (oldest first) owning `message`, or None. Never fails.
    pub fn find<'a, I>(&self, message: &Message, conversations: I) -> Option<ConversationMatch>
    where
        I: IntoIterator<Item = &'a Conversation>,
    {
        if !message.kind.is_conversational() {
            return None;
        }
        let conversation = conversations
            .into_iter()
            .find(|c| c.is_active() && c.owns(message))?;
        log::debug!(
            "message from {}/{} continues conversation {}",
            message.user,
            message.channel,
            conversation.id
        );
        let message = match message.text.as_deref() {
            Some(text) => message.rewritten(self.normalize(text)),
            None => message.clone(),
        };
        Some(ConversationMatch {
            conversation: conversation.clone(),
            message,
        })
    }

    /// Trim, drop the first id token, then trim leading whitespace and a `: ` separator.
    pub fn normalize(&self, text: &str) -> String {
        let stripped = self.id_token.replacen(text.trim(), 1, "");
        let rest = stripped.trim_start();
        let rest = match rest.strip_prefix(':') {
            Some(after) if after.starts_with(char::is_whitespace) => after,
            _ => rest,
        };
        rest.trim_start().to_string()
    }
}
