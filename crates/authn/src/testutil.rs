//! Shared test utilities for code built on the authentication layer.
//!
//! Feature-gated behind `testutil`. Enable it from `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! tokengate-authn = { path = "../authn", features = ["testutil"] }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tokengate_storage::{StorageError, UserId};

use crate::{
    config::{AuthConfig, CookieConfig},
    error::{AuthError, Result},
    jwt::{TokenCodec, unix_now},
    revocation::RevocationStore,
};

/// Secret used by [`test_config`].
pub const TEST_SECRET: &str = "tokengate-test-secret-0123456789abcdef";

/// A valid configuration with a fixed secret, default TTL, a cookie that is
/// sent over plain HTTP, and the sweeper disabled.
#[must_use]
pub fn test_config() -> AuthConfig {
    AuthConfig::builder()
        .secret(TEST_SECRET)
        .cookie(CookieConfig::builder().secure(false).build())
        .sweep_interval(Duration::ZERO)
        .build()
        .expect("test config is valid")
}

/// Builds a token string from raw header and payload JSON with a fake
/// signature. For exercising the verifier with hostile input.
#[must_use]
pub fn craft_raw_jwt(header: &serde_json::Value, payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    let signature = URL_SAFE_NO_PAD.encode(b"not-a-real-signature");
    format!("{header}.{payload}.{signature}")
}

/// Issues a correctly signed token for `subject` that expired an hour ago.
#[must_use]
pub fn issue_expired_token(codec: &TokenCodec, subject: UserId) -> String {
    let issued_at = unix_now() - codec.ttl().as_secs() - 3600;
    codec.issue_at(subject, "expired@example.com", issued_at).expect("issue expired token").token
}

/// A revocation store whose every operation fails with a storage connection
/// error. Stands in for an unreachable store when testing fail-closed paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingRevocationStore;

fn unreachable_store() -> AuthError {
    AuthError::storage(StorageError::connection("revocation store unreachable"))
}

#[async_trait]
impl RevocationStore for FailingRevocationStore {
    async fn revoke(&self, _token: &str, _expires_at: u64) -> Result<()> {
        Err(unreachable_store())
    }

    async fn is_revoked(&self, _token: &str) -> Result<bool> {
        Err(unreachable_store())
    }

    async fn purge_expired(&self) -> Result<u64> {
        Err(unreachable_store())
    }
}

/// Asserts that a `Result` is an `Err` holding the given [`AuthError`]
/// variant.
///
/// ```ignore
/// use tokengate_authn::{AuthError, assert_auth_error};
///
/// let result: Result<(), AuthError> = Err(AuthError::Expired);
/// assert_auth_error!(result, Expired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {{
        let result = &$result;
        assert!(
            matches!(result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            result,
        );
    }};
}
