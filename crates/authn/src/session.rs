//! Session service: login, logout, identity lookup, registration and token
//! introspection.
//!
//! The service composes the [`TokenCodec`], a [`RevocationStore`] and an
//! external [`UserStore`]. It is transport-agnostic; mapping its errors to
//! responses is the caller's job, with every error for which
//! [`AuthError::is_unauthenticated`] holds flattened to one uniform outcome.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tokengate_authn::{
//!     config::AuthConfig, jwt::TokenCodec, revocation::InMemoryRevocationStore,
//!     session::SessionService,
//! };
//! use tokengate_storage::{MemoryBackend, users::MemoryUserStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tokengate_authn::AuthError> {
//! let config = AuthConfig::builder().secret("an-example-secret-that-is-at-least-32-bytes").build()?;
//! let session = SessionService::new(
//!     Arc::new(TokenCodec::new(&config)),
//!     Arc::new(InMemoryRevocationStore::new()),
//!     Arc::new(MemoryUserStore::new(MemoryBackend::new())),
//! );
//!
//! session.register("Ada", "ada@example.com", "analytical engine").await?;
//! let login = session.login("ada@example.com", "analytical engine").await?;
//! assert_eq!(session.get_identity(&login.token).await?.name, "Ada");
//!
//! session.logout(&login.token).await?;
//! assert!(session.gate().admit(Some(&login.token)).await.is_err());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokengate_storage::{
    StorageError, UserId,
    users::{NewUser, UserProfile, UserStore},
};
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, Result},
    gate::RequestGate,
    jwt::{IdentityClaims, TokenCodec},
    password::{self, hash_password, verify_dummy, verify_password},
    revocation::RevocationStore,
    validation::validate_registration,
};

/// Result of a successful login.
#[derive(Clone, Serialize)]
pub struct LoginOutcome {
    /// The session token.
    pub token: String,
    /// When `token` expires.
    pub expires_at: DateTime<Utc>,
    /// Profile of the authenticated account.
    pub user: UserProfile,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Metadata returned by [`SessionService::validate_token`].
///
/// Invalid tokens carry no claims and no reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    /// Whether the token would be admitted right now.
    pub valid: bool,
    /// The verified claims, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<IdentityClaims>,
    /// Token expiry, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenValidation {
    fn invalid() -> Self {
        Self { valid: false, claims: None, expires_at: None }
    }
}

/// Best-effort session state for client bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProbe {
    /// Whether the presented token is admitted and resolves to an active
    /// account.
    pub is_authenticated: bool,
    /// The presented token when authenticated, otherwise empty.
    pub token: String,
    /// Always `false`; lets clients reuse the payload as their loading state.
    pub is_loading: bool,
    /// The account profile when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl SessionProbe {
    /// The unauthenticated shape.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { is_authenticated: false, token: String::new(), is_loading: false, user: None }
    }
}

/// Orchestrates the session lifecycle.
#[derive(Clone)]
pub struct SessionService {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
    users: Arc<dyn UserStore>,
    gate: RequestGate,
}

impl SessionService {
    /// Creates a service over the given codec and stores.
    ///
    /// Computes the Argon2 hash used on the unknown-account login path, so
    /// the first call is not instant.
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        if !password::warm_up() {
            tracing::warn!("dummy password hash unavailable, login timing is not equalized");
        }
        let gate = RequestGate::new(Arc::clone(&codec), Arc::clone(&revocations));
        Self { codec, revocations, users, gate }
    }

    /// The request gate sharing this service's codec and revocation store.
    #[must_use]
    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// The token codec.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Checks credentials and issues a session token.
    ///
    /// Unknown emails, deactivated accounts and wrong passwords all fail the
    /// same way and cost one password verification each.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidInput`] if either field is empty
    /// - [`AuthError::InvalidCredentials`] if the credentials do not match an
    ///   active account
    /// - [`AuthError::Storage`] if the user store fails
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::invalid_input("email and password are required"));
        }

        let account = self.users.find_by_email(email).await?;
        let password = Zeroizing::new(password.to_owned());

        let account = match account {
            Some(user) if user.active => {
                let hash = user.password_hash.clone();
                let matches = blocking(move || verify_password(&hash, &password)).await?;
                matches.then_some(user)
            },
            _ => {
                blocking(move || verify_dummy(&password)).await?;
                None
            },
        };

        let Some(user) = account else {
            tracing::info!(audit.action = "login", audit.result = "denied", "audit_event");
            return Err(AuthError::InvalidCredentials);
        };

        let issued = self.codec.issue(user.id, &user.email)?;
        tracing::info!(
            audit.action = "login",
            audit.result = "success",
            user.id = %user.id,
            "audit_event"
        );

        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.claims.expires_at(),
            user: user.profile(),
        })
    }

    /// Revokes `token`.
    ///
    /// An expired token needs no revocation and succeeds without recording
    /// anything.
    ///
    /// # Errors
    ///
    /// - any verification error other than [`AuthError::Expired`]; nothing is
    ///   recorded for a token that does not verify
    /// - [`AuthError::Storage`] if the revocation cannot be recorded
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(AuthError::Expired) => {
                tracing::debug!("logout with expired token, nothing to revoke");
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        if let Err(e) = self.revocations.revoke(token, claims.exp).await {
            tracing::warn!(
                audit.action = "logout",
                audit.result = "error",
                user.id = %claims.sub,
                error = %e,
                "audit_event"
            );
            return Err(e);
        }

        tracing::info!(
            audit.action = "logout",
            audit.result = "success",
            user.id = %claims.sub,
            "audit_event"
        );
        Ok(())
    }

    /// Resolves `token` to the current profile of its subject.
    ///
    /// The profile is always fetched fresh, so renames and deactivations take
    /// effect on the next call.
    ///
    /// # Errors
    ///
    /// - any verification error from [`TokenCodec::verify`]
    /// - [`AuthError::UnknownSubject`] if the account is gone or deactivated
    /// - [`AuthError::Storage`] if the user store fails
    #[tracing::instrument(skip_all)]
    pub async fn get_identity(&self, token: &str) -> Result<UserProfile> {
        let claims = self.codec.verify(token)?;
        self.active_profile(claims.subject()?).await
    }

    /// Profile of an active account.
    ///
    /// # Errors
    ///
    /// [`AuthError::UnknownSubject`] if the account is gone or deactivated,
    /// [`AuthError::Storage`] if the user store fails.
    #[tracing::instrument(skip(self))]
    pub async fn active_profile(&self, subject: UserId) -> Result<UserProfile> {
        match self.users.get_user(subject).await? {
            Some(user) if user.active => Ok(user.profile()),
            Some(_) => {
                tracing::debug!(user.id = %subject, "account deactivated");
                Err(AuthError::unknown_subject(subject.to_string()))
            },
            None => Err(AuthError::unknown_subject(subject.to_string())),
        }
    }

    /// Creates an account. Never issues a token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidInput`] if a field fails validation
    /// - [`AuthError::AlreadyRegistered`] if the email is taken
    /// - [`AuthError::Hashing`] or [`AuthError::Storage`] on infrastructure
    ///   failure
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserProfile> {
        validate_registration(name, email, password)?;

        let password = Zeroizing::new(password.to_owned());
        let password_hash = blocking(move || hash_password(&password)).await??;

        let new_user = NewUser::builder()
            .name(name.trim())
            .email(email.trim())
            .password_hash(password_hash)
            .build();

        match self.users.create_user(new_user).await {
            Ok(user) => {
                tracing::info!(
                    audit.action = "register",
                    audit.result = "success",
                    user.id = %user.id,
                    "audit_event"
                );
                Ok(user.profile())
            },
            Err(StorageError::Conflict) => {
                tracing::info!(audit.action = "register", audit.result = "conflict", "audit_event");
                Err(AuthError::AlreadyRegistered)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Reports whether `token` would be admitted right now.
    ///
    /// Unlike the gate, a revocation store failure is reported rather than
    /// guessed at.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidInput`] for a blank token
    /// - [`AuthError::Storage`] if revocation status cannot be determined
    #[tracing::instrument(skip_all)]
    pub async fn validate_token(&self, token: &str) -> Result<TokenValidation> {
        if token.trim().is_empty() {
            return Err(AuthError::invalid_input("token is required"));
        }

        if self.revocations.is_revoked(token).await? {
            return Ok(TokenValidation::invalid());
        }

        match self.codec.verify(token) {
            Ok(claims) => Ok(TokenValidation {
                valid: true,
                expires_at: Some(claims.expires_at()),
                claims: Some(claims),
            }),
            Err(e) if e.is_unauthenticated() => {
                tracing::debug!(error.kind = %e.kind(), "token failed validation");
                Ok(TokenValidation::invalid())
            },
            Err(e) => Err(e),
        }
    }

    /// Best-effort session state for `token`. Never fails: any problem yields
    /// [`SessionProbe::anonymous`].
    #[tracing::instrument(skip_all)]
    pub async fn probe(&self, token: Option<&str>) -> SessionProbe {
        let ctx = match self.gate.admit(token).await {
            Ok(ctx) => ctx,
            Err(_) => return SessionProbe::anonymous(),
        };

        match self.active_profile(ctx.subject).await {
            Ok(user) => SessionProbe {
                is_authenticated: true,
                token: ctx.token,
                is_loading: false,
                user: Some(user),
            },
            Err(e) => {
                if !e.is_unauthenticated() {
                    tracing::warn!(error = %e, "session probe could not load profile");
                }
                SessionProbe::anonymous()
            },
        }
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").field("codec", &self.codec).finish_non_exhaustive()
    }
}

/// Runs CPU-bound password work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AuthError::hashing(format!("password task failed: {e}")))
}
