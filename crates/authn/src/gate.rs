//! Request gate: the per-request admission check for protected operations.
//!
//! Each request moves through four states:
//!
//! 1. **Extract**: a token must be present.
//! 2. **Check revocation**: a revoked token is rejected. A store failure is
//!    treated as revoked.
//! 3. **Verify**: signature, structure and expiry via [`TokenCodec`].
//! 4. **Admit**: the caller receives an [`AuthContext`].
//!
//! Every rejection is an [`AuthError`] for which
//! [`is_unauthenticated`](AuthError::is_unauthenticated) holds. The gate
//! keeps no state between requests.

use std::sync::Arc;

use tokengate_storage::UserId;

use crate::{
    error::{AuthError, Result},
    jwt::TokenCodec,
    revocation::RevocationStore,
};

/// Identity attached to an admitted request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// The authenticated user.
    pub subject: UserId,
    /// Email carried in the token.
    pub email: String,
    /// The raw token, needed to revoke it on logout.
    pub token: String,
    /// Token expiry (seconds since epoch).
    pub expires_at: u64,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Admits or rejects requests based on their session token.
#[derive(Clone)]
pub struct RequestGate {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
}

impl RequestGate {
    /// Creates a gate over the given codec and revocation store.
    pub fn new(codec: Arc<TokenCodec>, revocations: Arc<dyn RevocationStore>) -> Self {
        Self { codec, revocations }
    }

    /// Runs the admission check on an optional token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingToken`] if `token` is absent or blank
    /// - [`AuthError::Revoked`] if the token is revoked or revocation status
    ///   cannot be determined
    /// - any verification error from [`TokenCodec::verify`]
    #[tracing::instrument(skip_all)]
    pub async fn admit(&self, token: Option<&str>) -> Result<AuthContext> {
        let result = self.check(token).await;
        match &result {
            Ok(ctx) => tracing::debug!(user.id = %ctx.subject, "request admitted"),
            Err(e) => tracing::debug!(
                audit.action = "gate.reject",
                audit.result = "denied",
                error.kind = %e.kind(),
                "audit_event"
            ),
        }
        result
    }

    async fn check(&self, token: Option<&str>) -> Result<AuthContext> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;

        match self.revocations.is_revoked(token).await {
            Ok(false) => {},
            Ok(true) => return Err(AuthError::Revoked),
            Err(e) => {
                tracing::warn!(
                    audit.action = "revocation.fail_closed",
                    audit.result = "denied",
                    error = %e,
                    "audit_event"
                );
                return Err(AuthError::Revoked);
            },
        }

        let claims = self.codec.verify(token)?;
        let subject = claims.subject()?;

        Ok(AuthContext { subject, email: claims.email, token: token.to_owned(), expires_at: claims.exp })
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate").field("codec", &self.codec).finish_non_exhaustive()
    }
}
