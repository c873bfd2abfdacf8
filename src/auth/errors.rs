//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Rejections from the bearer-token gate.
///
/// The distinction is deliberate: an absent credential is 401, a credential
/// that is present but fails verification is 403.
#[derive(Debug)]
pub enum AuthError {
    /// No bearer token in the authorization header.
    MissingToken,
    /// Token present but signature or expiry check failed.
    InvalidToken,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Access token is required"),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid or expired access token"),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
