//! Gateway HTTP server: WhatsApp webhook (verify + receive), health, and manual send endpoints.

use crate::channels::{is_whatsapp_object, WebhookEvent, WhatsAppChannel};
use crate::config::Config;
use crate::relay::{build_http_client, Relay};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SUBSCRIBE_MODE: &str = "subscribe";
const DEFAULT_TEMPLATE: &str = "hello_world";
const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

/// Shared state for all handlers. Everything here is immutable after startup.
#[derive(Clone)]
pub struct GatewayState {
    config: Arc<Config>,
    relay: Relay,
    whatsapp: Arc<WhatsAppChannel>,
}

impl GatewayState {
    /// Build the WhatsApp connector, completion client, and relay from config.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = build_http_client(&config)?;
        let whatsapp = Arc::new(WhatsAppChannel::new(&config.whatsapp, client.clone()));
        let relay = Relay::from_config(&config, client, whatsapp.clone());
        Ok(Self {
            config: Arc::new(config),
            relay,
            whatsapp,
        })
    }
}

/// Routes served by the gateway.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/api/send-message", post(api_send_message))
        .route("/api/send-template", post(api_send_template))
        .with_state(state)
}

/// Run the gateway server; binds to config.server.bind:config.server.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    if config.verify_token().is_none() {
        log::warn!("no verify token configured (VERIFY_TOKEN); webhook verification will always fail");
    }
    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let state = GatewayState::from_config(config)?;
    let app = router(state);

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
/// Relay tasks still in flight are dropped with the runtime.
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
    log::info!("shutdown signal received, draining connections");
}

#[derive(Debug, Default, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// True when the platform's subscription request carries mode "subscribe" and the shared token.
/// Both tokens are compared with surrounding whitespace removed; an empty token never matches.
fn subscription_verified(mode: Option<&str>, token: Option<&str>, expected: Option<&str>) -> bool {
    match (mode, token, expected) {
        (Some(SUBSCRIBE_MODE), Some(token), Some(expected)) => {
            let expected = expected.trim();
            !expected.is_empty() && token.trim() == expected
        }
        _ => false,
    }
}

/// GET /webhook — subscription handshake. Echoes hub.challenge on success, 403 otherwise,
/// including when the query string itself does not parse.
async fn verify_webhook(
    State(state): State<GatewayState>,
    query: Result<Query<VerifyParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            log::warn!("webhook: verification failed (bad query: {})", e);
            return StatusCode::FORBIDDEN.into_response();
        }
    };
    let expected = state.config.verify_token();
    if subscription_verified(
        params.mode.as_deref(),
        params.token.as_deref(),
        expected.as_deref(),
    ) {
        log::info!("webhook: subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        log::warn!("webhook: verification failed (mode={:?})", params.mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /webhook — WhatsApp notification. Dispatches relay work per message and acknowledges
/// immediately; downstream failures never change the status returned to the platform.
async fn receive_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let body: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("webhook: invalid payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if !is_whatsapp_object(&body) {
        log::debug!("webhook: ignoring object {:?}", body.get("object"));
        return StatusCode::NOT_FOUND.into_response();
    }
    let event: WebhookEvent = match serde_json::from_value(body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("webhook: invalid whatsapp payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    for inbound in event.inbound_messages() {
        state.relay.dispatch(inbound);
    }
    (StatusCode::OK, "OK").into_response()
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "service": "whatsapp-relay",
        "webhook": "/webhook",
        "port": state.config.server.port,
    }))
}

#[derive(Debug, Deserialize)]
struct SendMessageParams {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SendTemplateParams {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

fn send_result(result: Result<(), crate::channels::DeliveryError>) -> (StatusCode, Json<serde_json::Value>) {
    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))),
        Err(e) => {
            log::warn!("api: send failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

fn missing(field: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": format!("{} required", field) })),
    )
}

/// POST /api/send-message — operator-initiated text to a phone number.
async fn api_send_message(
    State(state): State<GatewayState>,
    Json(params): Json<SendMessageParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    let phone = params.phone.trim();
    if phone.is_empty() || params.message.trim().is_empty() {
        return missing("phone and message");
    }
    send_result(state.relay.send_reply(phone, &params.message).await)
}

/// POST /api/send-template — send a template (default hello_world / en_US).
async fn api_send_template(
    State(state): State<GatewayState>,
    Json(params): Json<SendTemplateParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    let phone = params.phone.trim();
    if phone.is_empty() {
        return missing("phone");
    }
    let template = params.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let language = params.language.as_deref().unwrap_or(DEFAULT_TEMPLATE_LANGUAGE);
    send_result(state.whatsapp.send_template(phone, template, language).await)
}
