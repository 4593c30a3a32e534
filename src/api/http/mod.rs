// src/api/http/mod.rs

pub mod health;
pub mod webhook;

use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(webhook::create_webhook_router())
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
