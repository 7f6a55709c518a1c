use lk_client::DispatchClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use token_service::config::Config;
use token_service::handlers::AppState;
use token_service::routes;
use token_service::services::dispatch_service::DispatchService;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting token gateway");

    // Load configuration; missing platform credentials abort startup.
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        environment = config.environment.as_str(),
        debug = config.debug,
        "Configuration loaded"
    );

    let dispatcher = DispatchClient::new(
        &config.livekit_api_url,
        &config.livekit_api_key,
        config.livekit_api_secret.clone(),
    )
    .map_err(|e| {
        error!("Failed to build platform client: {}", e);
        e
    })?;

    let dispatch = DispatchService::new(
        Arc::new(dispatcher),
        Duration::from_secs(config.dispatch_cache_ttl_seconds),
        &config.agent_name,
        config.max_room_name_length,
    );

    let bind_address = config.bind_address();
    let state = Arc::new(AppState { config, dispatch });
    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Token gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
