//! Webserver: slash commands and outgoing webhooks feed the router.
//!
//! Each request gets a one-shot responder bound to it, so handlers can answer through
//! `reply_public` / `reply_private` while the request is open, or use the delayed
//! replies with the request's `response_url` after it closes.

mod protocol;
mod server;

pub use protocol::{Health, OneshotResponder, SlashCommandForm, WebhookForm};
pub use server::{router, run_webserver, shutdown_signal, WebState};
