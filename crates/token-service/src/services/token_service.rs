//! Access-token issuance.
//!
//! Validation and grant construction happen here; the cryptographic signing
//! is delegated to the platform binding. When the request also asks for an
//! agent, the dispatch goes through the deduplicator synchronously but a
//! dispatch failure never fails the token: the caller gets the grant plus a
//! `dispatch_warning`.

use crate::config::Config;
use crate::errors::ApiError;
use crate::models::{DispatchRequest, TokenRequest, TokenResponse};
use crate::services::dispatch_service::DispatchService;
use crate::services::{validate_identity, validate_room};
use chrono::Utc;
use lk_client::{AccessToken, VideoGrants};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Issue a signed access grant for a room/identity pair.
pub async fn issue_token(
    config: &Config,
    dispatch: &DispatchService,
    request: TokenRequest,
) -> Result<TokenResponse, ApiError> {
    validate_room(&request.room, config.max_room_name_length)?;

    let identity = match request.identity {
        Some(identity) => {
            validate_identity(&identity, config.max_identity_length)?;
            identity
        }
        None => format!("guest-{}", Uuid::new_v4().simple()),
    };

    let ttl_minutes = resolve_ttl(config, request.ttl_minutes)?;

    let mut grants = VideoGrants::participant(&request.room);
    if request.mic_only {
        grants = grants.with_publish_sources(&["microphone"]);
    }

    let token = AccessToken::new(&config.livekit_api_key, config.livekit_api_secret.clone())
        .with_identity(&identity)
        .with_name(request.name.as_deref().unwrap_or(&identity))
        .with_grants(grants)
        .with_ttl(Duration::from_secs(ttl_minutes as u64 * 60))
        .to_jwt()
        .map_err(|e| ApiError::Upstream(format!("token signing failed: {e}")))?;

    // Dispatch is best-effort: the grant is already signed and the partial-
    // failure policy says issuance wins.
    let dispatch_warning = if request.dispatch_agent {
        dispatch_for_token(config, dispatch, &request.room).await
    } else {
        None
    };

    info!(
        target: "token_service.tokens",
        room = %request.room,
        identity = %identity,
        ttl_minutes,
        mic_only = request.mic_only,
        dispatch_agent = request.dispatch_agent,
        "Token issued"
    );

    Ok(TokenResponse {
        token,
        ws_url: config.livekit_ws_url.clone(),
        room: request.room,
        identity,
        ttl_minutes,
        expires_at: Utc::now() + chrono::Duration::minutes(ttl_minutes),
        dispatch_warning,
    })
}

/// Default absent TTLs and reject out-of-range ones. Rejecting (rather than
/// clamping) keeps the issued grant identical to the requested one.
fn resolve_ttl(config: &Config, requested: Option<i64>) -> Result<i64, ApiError> {
    match requested {
        None => Ok(config.default_token_ttl_minutes),
        Some(ttl) if ttl >= 1 && ttl <= config.max_token_ttl_minutes => Ok(ttl),
        Some(_) => Err(ApiError::Validation {
            field: "ttl_minutes",
            message: format!(
                "ttl_minutes must be between 1 and {}",
                config.max_token_ttl_minutes
            ),
        }),
    }
}

async fn dispatch_for_token(
    config: &Config,
    dispatch: &DispatchService,
    room: &str,
) -> Option<String> {
    let metadata = serde_json::json!({
        "source": "api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": config.environment.as_str(),
    })
    .to_string();

    let result = dispatch
        .create_dispatch(DispatchRequest {
            room: room.to_string(),
            agent_name: None,
            metadata: Some(metadata),
        })
        .await;

    match result {
        Ok(_) => None,
        Err(e) => {
            warn!(
                target: "token_service.tokens",
                room = %room,
                error = %e,
                "Agent dispatch failed during token issuance; token returned without agent"
            );
            Some("agent dispatch failed; the token is valid but no agent was started".to_string())
        }
    }
}
