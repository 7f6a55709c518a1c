use crate::handlers::AppState;
use crate::models::{HealthResponse, LivenessResponse, ReadinessResponse, StatusResponse};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

/// Health check for monitoring and load balancing.
///
/// GET /api/v1/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        ws_url: state.config.livekit_ws_url.clone(),
        agent_name: state.config.agent_name.clone(),
        environment: state.config.environment.as_str().to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe: the service can issue tokens only with the platform
/// connection configured.
///
/// GET /api/v1/readiness
pub async fn readiness(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    // Config loading already fails fast on missing credentials, so this is
    // a belt-and-braces re-check for probe symmetry with older deployments.
    if state.config.livekit_ws_url.is_empty() || state.config.livekit_api_key.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                reason: Some("missing_configuration".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            reason: None,
        }),
    )
}

/// Liveness probe.
///
/// GET /api/v1/liveness
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Legacy status endpoint, older response shape. Use /health instead.
///
/// GET /api/v1/status
pub async fn legacy_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ws_url: state.config.livekit_ws_url.clone(),
        agent_name: state.config.agent_name.clone(),
        ok: !state.config.livekit_ws_url.is_empty() && !state.config.agent_name.is_empty(),
    })
}
