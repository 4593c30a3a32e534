// src/api/http/webhook.rs
// Webhook ingress: Meta handshake verification and inbound message
// delivery. Deliveries are acknowledged with "EVENT_RECEIVED" before the
// debounce writes run, so the provider never retries on slow storage.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::ApiError;
use crate::config::WebhookConfig;
use crate::db;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", get(verify_default).post(update_default))
        .route("/webhook/{tenant_id}", get(verify_tenant).post(update_tenant))
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Subset of the WhatsApp Cloud webhook payload this pipeline consumes.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<PayloadEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayloadEntry {
    #[serde(default)]
    pub changes: Vec<PayloadChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayloadChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: PayloadChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayloadChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: InboundText,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboundText {
    #[serde(default)]
    pub body: String,
}

/// One text message extracted from a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingTextMessage {
    pub from: String,
    pub id: String,
    pub text: String,
}

// GET /webhook and GET /webhook/{tenant_id}

async fn verify_default(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, ApiError> {
    verify(&state, params)
}

async fn verify_tenant(
    State(state): State<Arc<AppState>>,
    Path(_tenant_id): Path<i64>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, ApiError> {
    verify(&state, params)
}

fn verify(state: &AppState, params: VerifyParams) -> Result<(StatusCode, String), ApiError> {
    let mode = params.mode.unwrap_or_default();
    let token = params.verify_token.unwrap_or_default();

    if mode == "subscribe" && token == state.config.webhook.verify_token {
        return Ok((StatusCode::OK, params.challenge.unwrap_or_default()));
    }
    Err(ApiError::Forbidden)
}

// POST /webhook and POST /webhook/{tenant_id}

async fn update_default(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    update(state, None, headers, body).await
}

async fn update_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    update(state, Some(tenant_id), headers, body).await
}

async fn update(
    state: Arc<AppState>,
    path_tenant_id: Option<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = resolve_tenant_id(path_tenant_id, &state.config.webhook)?;

    let tenant = db::tenants::get_tenant(&state.db, tenant_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::TenantNotFound)?;
    if !tenant.is_active() {
        return Err(ApiError::TenantNotActive);
    }

    verify_signature(&state.config.webhook.app_secret, &headers, &body)?;

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("invalid json".to_string()))?;
    let messages = extract_text_messages(&payload);
    info!(tenant_id, count = messages.len(), "webhook delivery accepted");

    // Ack first; the debounce writes run detached and their failures are
    // logged, never surfaced to the provider.
    tokio::spawn(async move {
        let store = state.events.clone();
        for message in messages {
            let now = Utc::now();
            if let Err(e) = store
                .insert_debounced(tenant_id, &message.from, &message.id, &message.text, now)
                .await
            {
                error!(tenant_id, sender = %message.from, error = %e, "failed to persist debounced event");
            }
        }
    });

    Ok((StatusCode::OK, "EVENT_RECEIVED"))
}

fn resolve_tenant_id(
    path_tenant_id: Option<i64>,
    config: &WebhookConfig,
) -> Result<i64, ApiError> {
    path_tenant_id
        .or(config.default_tenant_id)
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "missing tenant id segment and no default tenant configured".to_string(),
            )
        })
}

/// Recompute HMAC-SHA-256 over the raw body and compare, in constant time,
/// against the `sha256=<hex>` signature header.
pub fn verify_signature(
    app_secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ApiError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::SignatureInvalid)?;
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or(ApiError::SignatureInvalid)?;
    let expected = hex::decode(hex_digest).map_err(|_| ApiError::SignatureInvalid)?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| ApiError::SignatureInvalid)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ApiError::SignatureInvalid)
}

/// Every non-empty text message in the delivery, in payload order. Other
/// message types (audio, image, reactions, ...) are ignored.
pub fn extract_text_messages(payload: &WebhookPayload) -> Vec<IncomingTextMessage> {
    let mut out = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field.trim() != "messages" {
                continue;
            }
            for message in &change.value.messages {
                if message.kind.trim().to_lowercase() != "text" {
                    continue;
                }
                let body = message.text.body.trim();
                if body.is_empty() {
                    continue;
                }
                out.push(IncomingTextMessage {
                    from: message.from.trim().to_string(),
                    id: message.id.trim().to_string(),
                    text: body.to_string(),
                });
            }
        }
    }
    out
}
