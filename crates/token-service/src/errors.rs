use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lk_client::DispatchError;
use serde::Serialize;
use thiserror::Error;

/// Service error taxonomy.
///
/// `Validation` carries the offending field so clients get field-level
/// messages; `Upstream` covers signing and dispatch failures against the
/// platform. Upstream detail is logged but never echoed to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed for {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Upstream platform error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            ApiError::Validation { field, message } => {
                tracing::warn!(
                    target: "token_service.errors",
                    field = %field,
                    message = %message,
                    "Request validation failed"
                );
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    message.clone(),
                    Some((*field).to_string()),
                )
            }
            ApiError::Upstream(detail) => {
                tracing::error!(
                    target: "token_service.errors",
                    detail = %detail,
                    "Upstream platform call failed"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The media platform could not complete the request".to_string(),
                    None,
                )
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
                None,
            ),
            ApiError::Internal => {
                tracing::error!(target: "token_service.errors", "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Validation {
                    field: "room",
                    message: "too long".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Upstream("boom".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::NotFound("resource".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_upstream_detail_not_leaked_to_caller() {
        let err = ApiError::Upstream("secret internal detail".to_string());
        let display = err.to_string();
        assert!(display.contains("secret internal detail"));

        // The HTTP body must carry only the generic message.
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_dispatch_error_converts_to_upstream() {
        let err: ApiError = DispatchError::Upstream("status 503".to_string()).into();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
