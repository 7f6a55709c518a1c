use crate::errors::ApiError;
use crate::handlers::{agent_handler, auth_handler, health_handler, AppState};
use crate::middleware::trusted_host;
use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Upper bound on request handling; upstream calls have their own tighter
/// timeouts inside the platform client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_routes(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        // Token issuance (GET kept for browser clients)
        .route(
            "/api/v1/auth/token",
            get(auth_handler::get_token).post(auth_handler::create_token),
        )
        // Agent dispatch
        .route("/api/v1/agent/dispatch", post(agent_handler::create_dispatch))
        // Probes
        .route("/api/v1/health", get(health_handler::health))
        .route("/api/v1/readiness", get(health_handler::readiness))
        .route("/api/v1/liveness", get(health_handler::liveness))
        // Legacy endpoint, older shape
        .route("/api/v1/status", get(health_handler::legacy_status))
        .fallback(fallback_404)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trusted_host::enforce,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

async fn fallback_404() -> ApiError {
    ApiError::NotFound("resource".to_string())
}

/// Build the CORS layer from configuration. The `*` wildcard maps to the
/// permissive layer (which never allows credentials, per the CORS spec);
/// explicit origin lists honor the configured credentials flag.
fn cors_layer(state: &AppState) -> CorsLayer {
    let config = &state.config;

    if config.cors_allow_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let methods = if config.cors_allow_methods.iter().any(|m| m == "*") {
        AllowMethods::mirror_request()
    } else {
        AllowMethods::list(
            config
                .cors_allow_methods
                .iter()
                .filter_map(|m| m.parse::<Method>().ok()),
        )
    };

    let headers = if config.cors_allow_headers.iter().any(|h| h == "*") {
        AllowHeaders::mirror_request()
    } else {
        AllowHeaders::list(
            config
                .cors_allow_headers
                .iter()
                .filter_map(|h| h.parse::<HeaderName>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.cors_allow_credentials)
}
