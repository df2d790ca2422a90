//! HTTP error responses.
//!
//! Every authentication failure collapses into one 401 body so a client
//! cannot tell a missing cookie from a forged, expired or revoked token. The
//! internal [`ErrorKind`](tokengate_authn::ErrorKind) is logged instead.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokengate_authn::AuthError;

/// Errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Any rejected or absent session.
    #[error("unauthorized")]
    Unauthorized,

    /// Login with credentials that match no active account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Unparseable body or invalid field.
    #[error("{0}")]
    BadRequest(String),

    /// Registration for an email that is already taken.
    #[error("email already registered")]
    AlreadyRegistered,

    /// The revocation could not be recorded.
    #[error("failed to logout")]
    LogoutFailed(#[source] AuthError),

    /// Storage, hashing or other infrastructure failure.
    #[error("internal server error")]
    Internal(#[source] AuthError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Client-facing message.
    pub error: String,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::AlreadyRegistered => StatusCode::BAD_REQUEST,
            Self::LogoutFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::InvalidInput(message) => Self::BadRequest(message),
            AuthError::AlreadyRegistered => Self::AlreadyRegistered,
            err if err.is_unauthenticated() => {
                tracing::debug!(error.kind = %err.kind(), "request unauthenticated");
                Self::Unauthorized
            },
            err => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        Self::BadRequest("invalid request body".to_owned())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::LogoutFailed(source) | Self::Internal(source) = &self {
            tracing::error!(error = %self, source = ?source, "request failed");
        }

        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
