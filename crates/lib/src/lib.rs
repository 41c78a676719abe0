//! Shellbot core library: conversation-aware message routing, reply delivery,
//! and the webserver used by the CLI.

pub mod bot;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod message;
pub mod reply;
pub mod routing;

pub use bot::{Bot, RouteOutcome};
pub use message::{Message, MessageKind, DM_CHANNEL};
pub use reply::{DeliveryError, ReplyContext, ReplyEnvelope, ReplyPayload};
pub use routing::{handler_fn, Event, EventKind};
