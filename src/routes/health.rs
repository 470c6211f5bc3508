//! Health and index endpoints
//!
//! - `/health` - liveness plus whether a session credential is held
//! - `/` - service name, version and endpoint directory

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether a session credential is currently held
    pub authenticated: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

/// Endpoint directory shown at `/`
#[derive(Debug, Serialize)]
pub struct EndpointDirectory {
    pub models: &'static str,
    pub chat: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: String,
    pub endpoints: EndpointDirectory,
}

/// Always 200; an unauthenticated proxy is still up and acquires on demand.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        authenticated: state.session.is_authenticated().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Puter AI Proxy",
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: EndpointDirectory {
            models: "GET /v1/models",
            chat: "POST /v1/chat/completions",
            health: "GET /health",
        },
    })
}
