//!
//! Global Plate functions server
//! -----------------------------
//! Axum HTTP service hosting the email and counting functions.
//!
//! Responsibilities:
//! - POST-only JSON endpoints answering with `{success: bool, ...}` envelopes.
//! - Permissive CORS (request origin and requested headers echoed back).
//! - Optional sample-data seeding on startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::mail::{EmailSender, SendGridClient};
use crate::storage::{DocumentStore, MemoryStore};

pub mod email;
pub mod counting;

/// Shared state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub mailer: Arc<dyn EmailSender>,
    pub store: Arc<dyn DocumentStore>,
    /// Sender address for every outgoing message.
    pub mail_from: String,
}

impl AppState {
    pub fn new(mailer: Arc<dyn EmailSender>, store: Arc<dyn DocumentStore>, mail_from: impl Into<String>) -> Self {
        Self { mailer, store, mail_from: mail_from.into() }
    }
}

/// All function routes with CORS applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "global-plate functions ok" }))
        .route("/sendEmail", any(email::send_email))
        .route("/sendBulkEmail", any(email::send_bulk_email))
        .route("/countCollection", any(counting::count_collection))
        .fallback(|| async { AppError::not_found("not_found", "No such function") })
        .layer(cors())
        .with_state(state)
}

/// Any origin may call the functions; the request's own origin and headers are echoed back.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::HEAD, Method::PUT, Method::PATCH, Method::POST, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Every function only accepts POST.
pub(crate) fn require_post(method: &Method) -> AppResult<()> {
    if method == Method::POST { Ok(()) } else { Err(AppError::method_not_allowed()) }
}

/// Decode a JSON body; unreadable bodies decode to the payload's default so validation reports them.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Render a handler result as the response envelope.
pub(crate) fn respond(result: AppResult<Value>) -> Response {
    match result {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Start the functions server with the given configuration.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let mailer = SendGridClient::new(cfg.sendgrid_api_base.clone(), cfg.sendgrid_api_key.clone());
    if !mailer.is_configured() {
        tracing::warn!("SENDGRID_API_KEY is not set; email functions will fail until it is configured");
    }
    let store = Arc::new(MemoryStore::new());
    if cfg.seed_on_start {
        let summary = crate::seed::seed_all(store.as_ref()).await.context("While seeding sample data")?;
        info!(events = ?summary.events, restaurants = ?summary.restaurants, "seeded sample data");
    }

    let state = AppState::new(Arc::new(mailer), store, cfg.mail_from.clone());
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting functions server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
