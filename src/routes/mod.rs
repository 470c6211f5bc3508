//! HTTP routes for the proxy
//!
//! This module defines all HTTP endpoints exposed to OpenAI-compatible
//! clients. There is no client authentication: the proxy binds to loopback
//! and any API key the client sends is ignored.

pub mod chat;
pub mod health;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models));

    let public_routes = Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
