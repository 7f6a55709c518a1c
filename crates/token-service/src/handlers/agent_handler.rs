use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::models::{DispatchRequest, DispatchResponse};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Handle an agent dispatch request.
///
/// POST /api/v1/agent/dispatch
///
/// Duplicate requests for the same (room, agent) within the cache TTL are
/// answered from the deduplicator without a second platform call.
pub async fn create_dispatch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let response = state.dispatch.create_dispatch(request).await?;
    Ok(Json(response))
}
