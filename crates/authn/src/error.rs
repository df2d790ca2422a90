//! Authentication error types.
//!
//! [`AuthError`] carries the precise reason a check failed so it can be
//! logged. [`ErrorKind`] is the coarse taxonomy callers branch on. At the
//! transport boundary every kind for which
//! [`AuthError::is_unauthenticated`] holds collapses into one uniform
//! response, so the precise reason never reaches the client.

use thiserror::Error;
use tokengate_storage::StorageError;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Match expressions outside
/// this crate need a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No token was presented.
    #[error("Missing token")]
    MissingToken,

    /// The token or input is structurally invalid.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token signature does not verify under the process secret.
    #[error("Invalid signature")]
    BadSignature,

    /// The token is past its expiry.
    #[error("Token expired")]
    Expired,

    /// The token was explicitly revoked.
    #[error("Token revoked")]
    Revoked,

    /// Login failed. Deliberately silent on whether the account exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A verified token names a subject that no longer resolves to an active
    /// account.
    #[error("Unknown subject: {subject}")]
    UnknownSubject {
        /// The `sub` claim that failed to resolve.
        subject: String,
    },

    /// A request field failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Registration used an email that already has an account.
    #[error("Email already registered")]
    AlreadyRegistered,

    /// Configuration was rejected at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// A backing store could not be used.
    ///
    /// Wraps the original [`StorageError`] so the full source chain is
    /// available to structured logging.
    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),
}

/// Coarse classification of an [`AuthError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No token was presented.
    MissingToken,
    /// Structurally invalid token.
    Malformed,
    /// Forged or corrupted token.
    BadSignature,
    /// Past expiry.
    Expired,
    /// Explicitly invalidated.
    Revoked,
    /// Login failure.
    InvalidCredentials,
    /// Token subject no longer maps to an active account.
    UnknownSubject,
    /// Request field failed validation.
    InvalidInput,
    /// Uniqueness violation, such as a duplicate registration.
    Conflict,
    /// A store or other backing service failed.
    InfrastructureFailure,
}

impl ErrorKind {
    /// Stable lowercase name, used as a log field value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UnknownSubject => "unknown_subject",
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::InfrastructureFailure => "infrastructure_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthError {
    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Creates an `UnknownSubject` error.
    #[must_use]
    pub fn unknown_subject(subject: impl Into<String>) -> Self {
        Self::UnknownSubject { subject: subject.into() }
    }

    /// Creates an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a `Hashing` error.
    #[must_use]
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing(message.into())
    }

    /// Creates a `Storage` error.
    #[must_use]
    pub fn storage(source: StorageError) -> Self {
        Self::Storage(source)
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingToken => ErrorKind::MissingToken,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::BadSignature => ErrorKind::BadSignature,
            Self::Expired => ErrorKind::Expired,
            Self::Revoked => ErrorKind::Revoked,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::UnknownSubject { .. } => ErrorKind::UnknownSubject,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AlreadyRegistered => ErrorKind::Conflict,
            Self::Configuration(_) | Self::Hashing(_) | Self::Storage(_) => {
                ErrorKind::InfrastructureFailure
            },
        }
    }

    /// Returns `true` for every failure that must surface as a uniform
    /// "unauthenticated" outcome.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingToken
                | ErrorKind::Malformed
                | ErrorKind::BadSignature
                | ErrorKind::Expired
                | ErrorKind::Revoked
                | ErrorKind::InvalidCredentials
                | ErrorKind::UnknownSubject
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

        match err.kind() {
            JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                AuthError::BadSignature
            },
            JwtErrorKind::ExpiredSignature => AuthError::Expired,
            JwtErrorKind::InvalidToken => AuthError::malformed("invalid token structure"),
            JwtErrorKind::Base64(_) => AuthError::malformed("invalid base64 segment"),
            JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
                AuthError::malformed("invalid token segment encoding")
            },
            JwtErrorKind::MissingRequiredClaim(claim) => {
                AuthError::malformed(format!("missing claim: {claim}"))
            },
            _ => AuthError::malformed(format!("token rejected: {err}")),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::malformed("bad").to_string(), "Malformed token: bad");
        assert_eq!(AuthError::Expired.to_string(), "Token expired");
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::unknown_subject("7").to_string(), "Unknown subject: 7");
    }

    #[test]
    fn test_kind_projection() {
        assert_eq!(AuthError::BadSignature.kind(), ErrorKind::BadSignature);
        assert_eq!(AuthError::AlreadyRegistered.kind(), ErrorKind::Conflict);
        assert_eq!(
            AuthError::storage(StorageError::timeout()).kind(),
            ErrorKind::InfrastructureFailure
        );
        assert_eq!(AuthError::hashing("oom").kind(), ErrorKind::InfrastructureFailure);
    }

    #[test]
    fn test_unauthenticated_covers_every_token_failure() {
        for err in [
            AuthError::MissingToken,
            AuthError::malformed("x"),
            AuthError::BadSignature,
            AuthError::Expired,
            AuthError::Revoked,
            AuthError::InvalidCredentials,
            AuthError::unknown_subject("1"),
        ] {
            assert!(err.is_unauthenticated(), "{err:?} should be unauthenticated");
        }

        assert!(!AuthError::invalid_input("x").is_unauthenticated());
        assert!(!AuthError::AlreadyRegistered.is_unauthenticated());
        assert!(!AuthError::storage(StorageError::timeout()).is_unauthenticated());
    }

    #[test]
    fn test_error_from_jsonwebtoken() {
        use jsonwebtoken::errors::{Error, ErrorKind as JwtErrorKind};

        let err: AuthError = Error::from(JwtErrorKind::InvalidSignature).into();
        assert!(matches!(err, AuthError::BadSignature));

        let err: AuthError = Error::from(JwtErrorKind::InvalidAlgorithm).into();
        assert!(matches!(err, AuthError::BadSignature));

        let err: AuthError = Error::from(JwtErrorKind::ExpiredSignature).into();
        assert!(matches!(err, AuthError::Expired));

        let err: AuthError = Error::from(JwtErrorKind::InvalidToken).into();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn test_storage_error_preserves_source_chain() {
        use std::error::Error;

        let auth_err: AuthError = StorageError::connection("connection refused").into();
        let source = auth_err.source().expect("source chain must be preserved");
        assert_eq!(source.to_string(), "Connection error: connection refused");
    }

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(ErrorKind::BadSignature.to_string(), "bad_signature");
        assert_eq!(ErrorKind::InfrastructureFailure.as_str(), "infrastructure_failure");
    }
}
