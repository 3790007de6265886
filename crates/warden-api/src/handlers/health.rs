//! Root and health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{HealthResponse, WelcomeResponse};
use crate::state::AppState;

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to {}", state.config.server.app_name),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
