//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub models: ModelInfo,
}

/// Identifiers of the models serving requests.
#[derive(Serialize)]
pub struct ModelInfo {
    pub face_locator: String,
    pub emotion_classifier: String,
    pub emoji_entries: usize,
}

/// Readiness check endpoint.
///
/// Models are loaded before the listener binds, so a running server is ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let processor = &state.processor;
    Json(ReadinessResponse {
        status: "ready".to_string(),
        models: ModelInfo {
            face_locator: processor.locator_name().to_string(),
            emotion_classifier: processor.classifier_model().to_string(),
            emoji_entries: processor.config().emoji_map.len(),
        },
    })
}
