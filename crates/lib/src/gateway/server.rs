//! Webserver for slash commands and outgoing webhooks (single port).

use crate::config::WebserverConfig;
use crate::gateway::protocol::{Health, OneshotResponder, SlashCommandForm, WebhookForm};
use crate::message::Message;
use crate::reply::ReplyContext;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared state for the webserver handlers.
#[derive(Clone)]
pub struct WebState {
    pub bot_name: String,
    pub port: u16,
    /// How long a request waits for a handler to call `reply_public` / `reply_private`.
    pub response_timeout: Duration,
    /// Inbound contexts for the router loop.
    pub inbound_tx: mpsc::Sender<ReplyContext>,
}

impl WebState {
    pub fn new(
        config: &WebserverConfig,
        bot_name: impl Into<String>,
        inbound_tx: mpsc::Sender<ReplyContext>,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            port: config.port,
            response_timeout: Duration::from_millis(config.response_timeout_ms),
            inbound_tx,
        }
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/slash", post(slash_command))
        .route("/webhook", post(outgoing_webhook))
        .with_state(state)
}

async fn health_http(State(state): State<WebState>) -> Json<Health> {
    Json(Health {
        runtime: "running".to_string(),
        bot: state.bot_name.clone(),
        port: state.port,
    })
}

async fn slash_command(
    State(state): State<WebState>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    log::debug!("slash command {} from {}", form.command, form.user_id);
    route_with_response(&state, form.into_message()).await
}

async fn outgoing_webhook(
    State(state): State<WebState>,
    Form(form): Form<WebhookForm>,
) -> Response {
    log::debug!(
        "outgoing webhook from {} (trigger {:?})",
        form.user_id,
        form.trigger_word
    );
    route_with_response(&state, form.into_message()).await
}

/// Bind a one-shot responder to the request, hand the message to the router, and answer
/// with whatever envelope a handler responds with. Empty 200 when the handlers finish
/// without responding or the response window closes.
async fn route_with_response(state: &WebState, message: Message) -> Response {
    let (responder, rx) = OneshotResponder::new();
    let ctx = ReplyContext::new(message).with_responder(Arc::new(responder));
    if state.inbound_tx.send(ctx).await.is_err() {
        log::warn!("webserver: router loop is gone, dropping request");
        return (StatusCode::SERVICE_UNAVAILABLE, "router unavailable").into_response();
    }
    match tokio::time::timeout(state.response_timeout, rx).await {
        Ok(Ok(envelope)) => Json(envelope).into_response(),
        Ok(Err(_)) => StatusCode::OK.into_response(),
        Err(_) => {
            log::debug!("webserver: no immediate response within {:?}", state.response_timeout);
            StatusCode::OK.into_response()
        }
    }
}

/// Run the webserver on config.bind:port until SIGINT/SIGTERM.
pub async fn run_webserver(state: WebState, bind: &str) -> Result<()> {
    let bind_addr = format!("{}:{}", bind.trim(), state.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webserver listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webserver exited")?;
    log::info!("webserver stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}
