//! Agent-dispatch RPC client.
//!
//! Dispatching an agent into a room is a single Twirp-style JSON RPC against
//! the platform API, authenticated with a short-lived admin token. The
//! [`AgentDispatcher`] trait is the seam callers mock in tests.

use crate::access_token::{AccessToken, TokenError};
use crate::grants::VideoGrants;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// RPC path for creating an agent dispatch.
const CREATE_DISPATCH_PATH: &str = "/twirp/livekit.AgentDispatchService/CreateDispatch";

/// Default HTTP request timeout for the dispatch RPC.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the dispatch RPC.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifetime of the admin token minted per RPC.
const ADMIN_TOKEN_TTL: Duration = Duration::from_secs(600);

/// Errors that can occur during an agent dispatch call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// HTTP transport failed (connect, timeout, DNS).
    #[error("Dispatch transport error: {0}")]
    Transport(String),

    /// The platform rejected the request (4xx).
    #[error("Dispatch rejected by platform: {0}")]
    Rejected(String),

    /// The platform returned a server error (5xx).
    #[error("Platform server error: {0}")]
    Upstream(String),

    /// The response body could not be parsed.
    #[error("Invalid dispatch response: {0}")]
    InvalidResponse(String),

    /// Signing the admin token failed.
    #[error("Dispatch auth token error: {0}")]
    Token(#[from] TokenError),

    /// The client could not be constructed.
    #[error("Dispatch client configuration error: {0}")]
    Configuration(String),
}

/// Capability to dispatch an agent into a room.
///
/// Implemented by [`DispatchClient`] against the real platform and by mocks
/// in tests.
#[async_trait::async_trait]
pub trait AgentDispatcher: Send + Sync {
    /// Ask the platform to attach `agent_name` to `room`.
    ///
    /// Returns the platform-assigned dispatch id.
    async fn create_dispatch(
        &self,
        room: &str,
        agent_name: &str,
        metadata: Option<&str>,
    ) -> Result<String, DispatchError>;
}

#[derive(Serialize)]
struct CreateDispatchRequest<'a> {
    agent_name: &'a str,
    room: &'a str,
    metadata: &'a str,
}

#[derive(Deserialize)]
struct CreateDispatchResponse {
    #[serde(default)]
    id: String,
}

/// HTTP client for the platform's agent-dispatch RPC.
pub struct DispatchClient {
    api_url: String,
    api_key: String,
    api_secret: SecretString,
    http_client: reqwest::Client,
}

impl DispatchClient {
    /// Create a client for the given API endpoint and credentials.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` when the underlying HTTP
    /// client cannot be built.
    pub fn new(
        api_url: &str,
        api_key: &str,
        api_secret: SecretString,
    ) -> Result<Self, DispatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Configuration(e.to_string()))?;

        Ok(DispatchClient {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret,
            http_client,
        })
    }

    /// Mint the short-lived admin token that authenticates the RPC.
    fn admin_token(&self, room: &str) -> Result<String, TokenError> {
        AccessToken::new(&self.api_key, self.api_secret.clone())
            .with_identity("agent-dispatch")
            .with_grants(VideoGrants::room_admin(room))
            .with_ttl(ADMIN_TOKEN_TTL)
            .to_jwt()
    }
}

#[async_trait::async_trait]
impl AgentDispatcher for DispatchClient {
    async fn create_dispatch(
        &self,
        room: &str,
        agent_name: &str,
        metadata: Option<&str>,
    ) -> Result<String, DispatchError> {
        let url = format!("{}{}", self.api_url, CREATE_DISPATCH_PATH);
        let token = self.admin_token(room)?;

        debug!(
            target: "lk_client.dispatch",
            room = %room,
            agent_name = %agent_name,
            "Creating agent dispatch"
        );

        let body = CreateDispatchRequest {
            agent_name,
            room,
            metadata: metadata.unwrap_or("{}"),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "lk_client.dispatch", error = %e, "Dispatch request failed");
                DispatchError::Transport(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            let parsed: CreateDispatchResponse = response.json().await.map_err(|e| {
                warn!(target: "lk_client.dispatch", error = %e, "Failed to parse dispatch response");
                DispatchError::InvalidResponse(e.to_string())
            })?;

            if parsed.id.is_empty() {
                return Err(DispatchError::InvalidResponse(
                    "response is missing a dispatch id".to_string(),
                ));
            }

            debug!(
                target: "lk_client.dispatch",
                dispatch_id = %parsed.id,
                room = %room,
                "Agent dispatch created"
            );
            Ok(parsed.id)
        } else if status.is_client_error() {
            // Body may carry platform diagnostics; keep it out of the error
            // message and log it at trace level only.
            let body_text = response.text().await.unwrap_or_default();
            warn!(
                target: "lk_client.dispatch",
                status = %status,
                room = %room,
                "Dispatch rejected by platform"
            );
            trace!(target: "lk_client.dispatch", body = %body_text, "Dispatch rejection body");
            Err(DispatchError::Rejected(format!("status {status}")))
        } else {
            warn!(
                target: "lk_client.dispatch",
                status = %status,
                room = %room,
                "Platform returned server error"
            );
            Err(DispatchError::Upstream(format!("status {status}")))
        }
    }
}
