//! Gateway HTTP server: carrier webhook, liveness probe, manual send.

use crate::channels::{CarrierHandle, IncomingMessage, WhatsAppChannel};
use crate::compose;
use crate::config::{self, Config};
use crate::llm::GeminiClient;
use crate::providers;
use crate::router;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state for the gateway (config, router, carrier).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Sender for inbound webhook messages. Processor task receives.
    pub inbound_tx: mpsc::Sender<IncomingMessage>,
    pub router: Arc<router::Router>,
    pub carrier: Arc<dyn CarrierHandle>,
    /// Names of the providers connected at startup (for the /test payload).
    pub provider_names: Arc<Vec<String>>,
}

/// Carrier webhook payload (Twilio form encoding).
#[derive(Debug, Deserialize)]
struct InboundForm {
    #[serde(rename = "From")]
    from: Option<String>,
    #[serde(rename = "Body")]
    body: Option<String>,
}

/// Manual-send request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    to: Option<String>,
    message: Option<String>,
}

/// Process one inbound message: route intents, compose the reply, send it back
/// through the carrier. Failures are logged only; the webhook already acked.
async fn process_inbound_message(state: GatewayState, msg: IncomingMessage) {
    let output = state.router.route(&msg.text).await;
    let reply = compose::compose_reply(&output, state.config.carrier.max_message_chars);
    if reply.trim().is_empty() {
        log::debug!("empty reply for {}, nothing to send", msg.sender);
        return;
    }
    if let Err(e) = state.carrier.send_message(&msg.sender, &reply).await {
        log::warn!("sending reply to {} failed: {}", msg.sender, e);
    }
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Spawns the configured tool providers, starts the processor task, and blocks
/// until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let carrier: Arc<dyn CarrierHandle> = Arc::new(WhatsAppChannel::new(
        config::resolve_twilio_account_sid(&config),
        config::resolve_twilio_auth_token(&config),
        config::resolve_whatsapp_number(&config),
        config.carrier.api_base.clone(),
    ));
    let fallback = Arc::new(GeminiClient::new(
        config::resolve_gemini_api_key(&config),
        config.llm.model.clone(),
        config.llm.api_base.clone(),
    ));
    let registry = providers::connect_providers(&config.providers).await;
    let provider_names = Arc::new(registry.provider_names());
    let msg_router = Arc::new(router::Router::new(Arc::new(registry), fallback));

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<IncomingMessage>(64);
    let state = GatewayState {
        config: Arc::new(config.clone()),
        inbound_tx,
        router: msg_router,
        carrier,
        provider_names,
    };

    {
        let state_inbound = state.clone();
        tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                process_inbound_message(state_inbound.clone(), msg).await;
            }
        });
    }

    let app = Router::new()
        .route("/webhook", post(carrier_webhook))
        .route("/test", get(test_status))
        .route("/send", post(send_manual))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST /webhook — carrier form payload; acks fast, defers processing to the
/// inbound queue. Missing sender is the only rejected shape.
async fn carrier_webhook(
    State(state): State<GatewayState>,
    Form(payload): Form<InboundForm>,
) -> (StatusCode, &'static str) {
    let Some(sender) = payload
        .from
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return (StatusCode::BAD_REQUEST, "missing From");
    };
    let text = payload.body.as_deref().map(str::trim).unwrap_or("");
    if text.is_empty() {
        return (StatusCode::OK, "OK");
    }
    let msg = IncomingMessage {
        sender: sender.to_string(),
        text: text.to_string(),
        received_at: Utc::now(),
    };
    log::info!("webhook from {}: {} chars", msg.sender, msg.text.chars().count());
    if state.inbound_tx.send(msg).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "queue closed");
    }
    (StatusCode::OK, "OK")
}

/// GET /test — liveness probe listing the connected providers.
async fn test_status(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "providers": state.provider_names.as_slice(),
        "webhookUrl": "/webhook",
    }))
}

/// POST /send — manual outbound send for operational testing.
async fn send_manual(
    State(state): State<GatewayState>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let to = req.to.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (Some(to), Some(message)) = (to, message) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "to and message are required" })),
        );
    };
    match state.carrier.send_message(to, message).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "sent": true }))),
        Err(e) => {
            log::warn!("manual send failed: {}", e);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e })))
        }
    }
}
