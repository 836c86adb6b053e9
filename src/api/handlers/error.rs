//! HTTP mapping for account workflow failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::ErrorResponse;
use crate::accounts::AccountError;

pub(crate) const INVALID_CREDENTIALS: &str = "invalid email or password";
pub(crate) const CURRENT_PASSWORD_MISMATCH: &str = "current password does not match";

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            Self::DuplicateIdentity => error_response(StatusCode::CONFLICT, "email already exists"),
            Self::IdentityNotFound => error_response(StatusCode::NOT_FOUND, "user not found"),
            // Login maps its own failures to INVALID_CREDENTIALS.
            Self::CredentialMismatch => {
                error_response(StatusCode::UNAUTHORIZED, CURRENT_PASSWORD_MISMATCH)
            }
            Self::OwnershipViolation => error_response(
                StatusCode::FORBIDDEN,
                "email does not match the logged-in account",
            ),
            Self::InvalidInput(message) => error_response(StatusCode::BAD_REQUEST, message),
            Self::Credential(_) | Self::Token(_) | Self::Repository(_) | Self::Worker(_) => {
                error!("Failed to handle account request: {self}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}
