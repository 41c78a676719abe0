//! Event-kind classification by addressing convention.
//!
//! The priority chain (DM, direct mention, mention, ambient) is fixed in
//! [`EventKind::PRIORITY`]; each kind decides for itself whether it accepts a message.

use crate::config::BotIdentity;
use crate::message::Message;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// How an inbound message was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Delivered in the DM context.
    DirectMessage,
    /// Text starts with `@<name>`.
    DirectMention,
    /// Text contains `@<name>` somewhere else.
    Mention,
    /// Not addressed to the bot.
    Ambient,
}

impl EventKind {
    /// Order in which kinds are tried; the first kind that accepts wins.
    pub const PRIORITY: [EventKind; 4] = [
        EventKind::DirectMessage,
        EventKind::DirectMention,
        EventKind::Mention,
        EventKind::Ambient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DirectMessage => "direct_message",
            EventKind::DirectMention => "direct_mention",
            EventKind::Mention => "mention",
            EventKind::Ambient => "ambient",
        }
    }

    /// Normalized message if this kind accepts `message`.
    fn accept(self, message: &Message, patterns: &NamePatterns) -> Option<Message> {
        match self {
            EventKind::DirectMessage => message.is_direct().then(|| message.clone()),
            EventKind::DirectMention => {
                let text = message.text.as_deref()?;
                patterns
                    .leading
                    .find(text)
                    .map(|m| message.rewritten(&text[m.end()..]))
            }
            EventKind::Mention => {
                let text = message.text.as_deref()?;
                patterns.anywhere.is_match(text).then(|| message.clone())
            }
            EventKind::Ambient => Some(message.clone()),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result. `message` is the normalized copy; the input is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: EventKind,
    pub message: Message,
}

struct NamePatterns {
    /// `@name`, an optional colon and surrounding whitespace, at the start of the text.
    leading: Regex,
    /// `@name` anywhere.
    anywhere: Regex,
}

/// Classifier bound to one bot display name. Patterns are compiled once.
pub struct Classifier {
    patterns: NamePatterns,
}

impl Classifier {
    pub fn new(identity: &BotIdentity) -> Result<Self, regex::Error> {
        let name = regex::escape(&identity.name);
        let leading = RegexBuilder::new(&format!(r"^@{}\s*:?\s*", name))
            .case_insensitive(true)
            .build()?;
        let anywhere = RegexBuilder::new(&format!("@{}", name))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            patterns: NamePatterns { leading, anywhere },
        })
    }

    /// Assign exactly one event kind. Never fails: anything unaddressed is ambient.
    pub fn classify(&self, message: &Message) -> Classified {
        for kind in EventKind::PRIORITY {
            if let Some(normalized) = kind.accept(message, &self.patterns) {
                return Classified {
                    kind,
                    message: normalized,
                };
            }
        }
        Classified {
            kind: EventKind::Ambient,
            message: message.clone(),
        }
    }
}
