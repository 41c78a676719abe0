//! Inbound routing: classification, conversation matching and event dispatch.
//!
//! Inbound: a message is first offered to the conversation matcher; if no active
//! conversation owns its (user, channel) pair it is classified and emitted on the bus.

mod bus;
mod classify;
mod matcher;

pub use bus::{handler_fn, Event, EventBus, EventHandler};
pub use classify::{Classified, Classifier, EventKind};
pub use matcher::{ConversationMatch, ConversationMatcher};

/// Failure to build the router's address patterns from the bot identity.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid address pattern: {0}")]
    Pattern(#[from] regex::Error),
}
