use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::models::{TokenRequest, TokenResponse};
use crate::services::token_service;
use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

/// Handle token issuance from a JSON body.
///
/// POST /api/v1/auth/token
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let response = token_service::issue_token(&state.config, &state.dispatch, request).await?;
    Ok(Json(response))
}

/// Handle token issuance from query parameters.
///
/// GET /api/v1/auth/token
///
/// Kept for browser clients that fetch a token with a plain GET before
/// joining; semantics are identical to the POST form.
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    Query(request): Query<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let response = token_service::issue_token(&state.config, &state.dispatch, request).await?;
    Ok(Json(response))
}
