//! Business logic layer: token issuance and dispatch deduplication.

pub mod dispatch_service;
pub mod token_service;

use crate::errors::ApiError;

// Rooms and identities are opaque strings on the platform side; only their
// length is bounded here.

pub(crate) fn validate_room(room: &str, max_len: usize) -> Result<(), ApiError> {
    if room.is_empty() {
        return Err(ApiError::Validation {
            field: "room",
            message: "room name must not be empty".to_string(),
        });
    }
    if room.len() > max_len {
        return Err(ApiError::Validation {
            field: "room",
            message: format!("room name exceeds maximum length of {max_len}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_identity(identity: &str, max_len: usize) -> Result<(), ApiError> {
    if identity.is_empty() {
        return Err(ApiError::Validation {
            field: "identity",
            message: "identity must not be empty".to_string(),
        });
    }
    if identity.len() > max_len {
        return Err(ApiError::Validation {
            field: "identity",
            message: format!("identity exceeds maximum length of {max_len}"),
        });
    }
    Ok(())
}
