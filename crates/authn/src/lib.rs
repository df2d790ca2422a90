//! # Tokengate Authentication
//!
//! Session tokens, revocation and the per-request gate for tokengate
//! services.
//!
//! This crate provides:
//! - **Token codec**: HS256 identity tokens with a fixed lifetime
//! - **Revocation**: per-token deny-list, in memory or on a storage backend,
//!   with a background sweeper
//! - **Session service**: login, logout, identity lookup and registration
//! - **Request gate**: admission check for protected operations
//!
//! ## Security Properties
//!
//! - Only HS256 is accepted; `none` and every other algorithm are rejected
//! - Revocation status is checked before the token is trusted, and an
//!   unavailable revocation store rejects the request
//! - Unknown accounts and wrong passwords fail identically and take the same
//!   Argon2 verification time
//! - Secrets, tokens and password hashes never appear in `Debug` output
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokengate_authn::{
//!     AuthConfig, InMemoryRevocationStore, RevocationSweeper, SessionService, TokenCodec,
//! };
//! use tokengate_storage::{MemoryBackend, users::MemoryUserStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::builder().secret(std::env::var("JWT_SECRET")?).build()?;
//! let revocations = Arc::new(InMemoryRevocationStore::new());
//! let session = SessionService::new(
//!     Arc::new(TokenCodec::new(&config)),
//!     revocations.clone(),
//!     Arc::new(MemoryUserStore::new(MemoryBackend::new())),
//! );
//! let _sweeper = config.sweep_interval().map(|every| RevocationSweeper::spawn(revocations, every));
//!
//! let login = session.login("ada@example.com", "analytical engine").await?;
//! let ctx = session.gate().admit(Some(&login.token)).await?;
//! println!("admitted user {}", ctx.subject);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`testutil`**: test doubles, a fixed test configuration and the
//!   [`assert_auth_error!`] macro
//! - **`failpoints`**: enables `fail` injection points in
//!   [`StorageRevocationStore`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Service configuration.
pub mod config;
/// Session cookie formatting and parsing.
pub mod cookie;
/// Authentication error types.
pub mod error;
/// Per-request admission.
pub mod gate;
/// Identity token issue and verification.
pub mod jwt;
/// Argon2id password hashing.
pub mod password;
/// Token revocation.
pub mod revocation;
/// Session lifecycle operations.
pub mod session;
/// Test doubles and helpers.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
/// Registration input validation.
pub mod validation;

// Re-export key types for convenience
pub use config::{AuthConfig, CookieConfig, SameSite, SecretKey};
pub use error::{AuthError, ErrorKind, Result};
pub use gate::{AuthContext, RequestGate};
pub use jwt::{IdentityClaims, IssuedToken, TOKEN_ALGORITHM, TokenCodec};
pub use revocation::{
    InMemoryRevocationStore, RevocationStore, RevocationSweeper, StorageRevocationStore,
};
pub use session::{LoginOutcome, SessionProbe, SessionService, TokenValidation};
