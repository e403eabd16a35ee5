//! Webhook listener with HMAC signature verification.
//!
//! Every delivery passes through the [`WebhookGate`] before its payload is
//! handed to the [`Translator`]. When a shared secret is configured, the
//! `X-Hub-Signature-256` header must carry `sha256=<hex HMAC-SHA256>` of the
//! exact request body bytes; the comparison is constant-time. Without a
//! secret, verification is switched off entirely.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/webhook` | Receive a GitHub delivery (`X-GitHub-Event` names the kind) |
//! | `GET`  | `/health` | Health check (returns version), no authentication |
//!
//! # Status codes
//!
//! `200` on success, including ignored events and payloads without the
//! objects an event needs. `401` when the signature is missing or wrong.
//! `500` for every other failure, with no details in the body.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::MemoryError;
use crate::store::Store;
use crate::translate::{EventKind, IngestSummary, Translator};

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Header naming the event kind.
pub const EVENT_HEADER: &str = "x-github-event";
/// GitHub caps webhook payloads at 25 MB.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Authenticates deliveries against an optional shared secret.
#[derive(Clone, Default)]
pub struct WebhookGate {
    secret: Option<String>,
}

impl WebhookGate {
    /// An empty secret is treated the same as no secret.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` (the raw header value) against `body`.
    pub fn verify(&self, signature: Option<&str>, body: &[u8]) -> Result<(), MemoryError> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(());
        };

        let signature = signature
            .ok_or_else(|| MemoryError::unauthorized("missing X-Hub-Signature-256 header"))?;

        if !verify_github_signature(secret, body, signature) {
            return Err(MemoryError::unauthorized("signature does not match payload"));
        }

        Ok(())
    }
}

/// The `X-Hub-Signature-256` value GitHub would send for `body`.
pub fn signature_for(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn verify_github_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Shared state for the webhook routes.
#[derive(Clone)]
struct AppState {
    gate: WebhookGate,
    translator: Translator,
}

/// Build the webhook router over an already-open store.
pub fn router(store: Arc<dyn Store>, gate: WebhookGate) -> Router {
    let state = AppState {
        gate,
        translator: Translator::new(store),
    };

    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve the webhook listener on `[webhook].bind` until `shutdown` resolves.
pub async fn run_webhook_server(
    config: &Config,
    store: Arc<dyn Store>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let gate = WebhookGate::new(config.webhook.secret().map(str::to_string));
    if !gate.is_enabled() {
        warn!("no webhook secret configured, signature verification is disabled");
    }

    let app = router(store, gate);

    let listener = tokio::net::TcpListener::bind(&config.webhook.bind)
        .await
        .with_context(|| format!("Failed to bind webhook listener to {}", config.webhook.bind))?;
    info!(
        addr = %listener.local_addr()?,
        "webhook server listening, deliveries accepted at POST /webhook"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error that converts into an HTTP response without leaking internals.
struct WebhookError {
    status: StatusCode,
    message: &'static str,
}

impl From<MemoryError> for WebhookError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Unauthorized(_) => WebhookError {
                status: StatusCode::UNAUTHORIZED,
                message: "Unauthorized",
            },
            MemoryError::Validation(_) | MemoryError::StorageUnavailable(_) => WebhookError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal server error",
            },
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ POST /webhook ============

#[derive(Serialize)]
struct WebhookResponse {
    message: String,
    indexed: IngestSummary,
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(e) = state.gate.verify(signature, &body) {
        warn!(error = %e, "rejected webhook delivery");
        return Err(e.into());
    }

    let kind = EventKind::from_header(headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()));
    info!(event = %kind, bytes = body.len(), "received webhook event");

    let indexed = state.translator.apply(&kind, &body).await.map_err(|e| {
        error!(event = %kind, error = %e, "error processing webhook");
        WebhookError::from(e)
    })?;

    Ok(Json(WebhookResponse {
        message: "Webhook processed successfully".to_string(),
        indexed,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
