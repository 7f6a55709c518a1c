use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token issuance request (JSON body or query string).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// Room to grant access to.
    pub room: String,
    /// Participant identity; a `guest-<uuid>` identity is generated when
    /// absent.
    pub identity: Option<String>,
    /// Display name shown to other participants.
    pub name: Option<String>,
    /// Grant lifetime in minutes; defaults to the configured value.
    pub ttl_minutes: Option<i64>,
    /// Restrict publishing to the microphone source.
    #[serde(default)]
    pub mic_only: bool,
    /// Dispatch the configured agent into the room alongside issuance.
    #[serde(default)]
    pub dispatch_agent: bool,
}

/// Issued access grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub ws_url: String,
    pub room: String,
    pub identity: String,
    pub ttl_minutes: i64,
    pub expires_at: DateTime<Utc>,
    /// Set when agent dispatch was requested but failed; the token itself
    /// is still valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_warning: Option<String>,
}

/// Agent dispatch request.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub room: String,
    /// Agent to dispatch; defaults to the configured agent name.
    pub agent_name: Option<String>,
    /// Opaque metadata handed to the agent, forwarded verbatim.
    pub metadata: Option<String>,
}

/// Agent dispatch result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub dispatch_id: String,
    pub room: String,
    pub agent_name: String,
    /// `duplicate-suppressed` when served from the dedup cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Health probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ws_url: String,
    pub agent_name: String,
    pub environment: String,
    pub timestamp: String,
    pub version: String,
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: String,
}

/// Legacy `/status` response, kept for old clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ws_url: String,
    pub agent_name: String,
    pub ok: bool,
}
