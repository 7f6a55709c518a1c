//! Host-header allow list.
//!
//! When `TRUSTED_HOSTS` is anything other than the `*` wildcard, requests
//! whose `Host` header is absent or not on the list are rejected before
//! reaching a handler. `*.example.com` patterns match one or more labels
//! under the suffix.

use crate::errors::ApiError;
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub async fn enforce(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = &state.config.trusted_hosts;
    if allowed.iter().any(|h| h == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port);

    match host {
        Some(host) if host_is_trusted(host, allowed) => next.run(request).await,
        _ => {
            tracing::warn!(
                target: "token_service.middleware",
                host = host.unwrap_or("<missing>"),
                "Rejected request from untrusted host"
            );
            ApiError::Validation {
                field: "host",
                message: "host is not trusted".to_string(),
            }
            .into_response()
        }
    }
}

/// Drop a trailing `:port` from a host header value (IPv6 literals keep
/// their brackets).
fn strip_port(value: &str) -> &str {
    if let Some(end) = value.rfind(']') {
        // [::1]:8080 -> [::1]
        return value.get(..=end).unwrap_or(value);
    }
    value.split(':').next().unwrap_or(value)
}

fn host_is_trusted(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix("*.") {
            host.strip_suffix(suffix)
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
        } else {
            pattern.eq_ignore_ascii_case(host)
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        let allowed = hosts(&["api.example.com", "localhost"]);
        assert!(host_is_trusted("api.example.com", &allowed));
        assert!(host_is_trusted("LOCALHOST", &allowed));
        assert!(!host_is_trusted("evil.example.com", &allowed));
    }

    #[test]
    fn test_wildcard_subdomain() {
        let allowed = hosts(&["*.example.com"]);
        assert!(host_is_trusted("api.example.com", &allowed));
        assert!(host_is_trusted("a.b.example.com", &allowed));
        assert!(!host_is_trusted("example.com", &allowed));
        assert!(!host_is_trusted("notexample.com", &allowed));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }
}
