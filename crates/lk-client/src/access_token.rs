//! Access token construction and signing.
//!
//! Tokens are HS256 JWTs signed with the platform API key/secret pair. The
//! claim layout is the platform's fixed contract: `iss` carries the API key,
//! `sub`/`jti` carry the participant identity, and the permission set lives
//! under the `video` claim.

use crate::grants::VideoGrants;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default grant lifetime when the builder is not given one explicitly.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Errors that can occur while building or signing a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// API key or secret is empty.
    #[error("API key and secret are required to sign a token")]
    MissingCredentials,

    /// No participant identity was set on the builder.
    #[error("A participant identity is required to sign a token")]
    MissingIdentity,

    /// JWT encoding failed.
    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// JWT claims for an access token.
///
/// The `sub` field carries a participant identity and is redacted in Debug
/// output so request logs never expose it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer: the platform API key.
    pub iss: String,
    /// Subject: participant identity.
    pub sub: String,
    /// Token id; the platform uses the identity here.
    pub jti: String,
    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
    /// Display name shown to other participants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Permission set.
    pub video: VideoGrants,
    /// Opaque participant metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("video", &self.video)
            .finish()
    }
}

/// Builder for signed access tokens.
///
/// # Example
///
/// ```rust
/// use lk_client::{AccessToken, SecretString, VideoGrants};
/// use std::time::Duration;
///
/// let jwt = AccessToken::new("api-key", SecretString::from("api-secret"))
///     .with_identity("alice")
///     .with_name("Alice")
///     .with_grants(VideoGrants::participant("studio-1"))
///     .with_ttl(Duration::from_secs(3600))
///     .to_jwt()?;
/// # Ok::<(), lk_client::TokenError>(())
/// ```
#[derive(Clone)]
pub struct AccessToken {
    api_key: String,
    api_secret: SecretString,
    identity: Option<String>,
    name: Option<String>,
    metadata: Option<String>,
    grants: VideoGrants,
    ttl: Duration,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("grants", &self.grants)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AccessToken {
    /// Create a builder for the given API key/secret pair.
    pub fn new(api_key: &str, api_secret: SecretString) -> Self {
        AccessToken {
            api_key: api_key.to_string(),
            api_secret,
            identity: None,
            name: None,
            metadata: None,
            grants: VideoGrants::default(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Set the participant identity (required).
    #[must_use]
    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    /// Set the display name shown to other participants.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Attach opaque participant metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &str) -> Self {
        self.metadata = Some(metadata.to_string());
        self
    }

    /// Set the permission grants.
    #[must_use]
    pub fn with_grants(mut self, grants: VideoGrants) -> Self {
        self.grants = grants;
        self
    }

    /// Set the grant lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sign the token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingCredentials` when the key/secret pair is
    /// empty, `TokenError::MissingIdentity` when no identity was set, and
    /// `TokenError::Encoding` when JWT encoding fails.
    pub fn to_jwt(&self) -> Result<String, TokenError> {
        if self.api_key.is_empty() || self.api_secret.expose_secret().is_empty() {
            return Err(TokenError::MissingCredentials);
        }

        let identity = self
            .identity
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingIdentity)?;

        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            jti: identity.to_string(),
            nbf: now,
            exp: now.saturating_add(ttl_secs),
            name: self.name.clone(),
            video: self.grants.clone(),
            metadata: self.metadata.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}
