//! Token codec: issuing and verifying signed identity tokens.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 under the process-wide
//! secret from [`AuthConfig`]. Verification always checks the signature
//! before looking at any claim, and only then compares the expiry against the
//! clock. The expiry instant itself is still valid: a token with `exp = T` is
//! accepted at `now = T` and rejected at `now = T + 1`.
//!
//! # Example
//!
//! ```
//! use tokengate_authn::{config::AuthConfig, jwt::TokenCodec};
//!
//! let config = AuthConfig::builder()
//!     .secret("an-example-secret-that-is-at-least-32-bytes")
//!     .build()?;
//! let codec = TokenCodec::new(&config);
//!
//! let issued = codec.issue_at(7.into(), "ada@example.com", 1_700_000_000)?;
//! let claims = codec.verify_at(&issued.token, 1_700_000_000 + 86_400)?;
//! assert_eq!(claims.sub, "7");
//!
//! assert!(codec.verify_at(&issued.token, 1_700_000_000 + 86_401).is_err());
//! # Ok::<(), tokengate_authn::AuthError>(())
//! ```

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tokengate_storage::UserId;

use crate::{
    config::AuthConfig,
    error::{AuthError, Result},
};

/// The only signing algorithm issued or accepted.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Random bytes in a token identifier.
const JTI_BYTES: usize = 16;

/// Identity claims embedded in every token.
///
/// ```json
/// {
///   "sub": "42",
///   "email": "ada@example.com",
///   "iat": 1700000000,
///   "exp": 1700086400,
///   "jti": "2m4xS0c1Vn1o6qvW3Z7bAg"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject: the user id, as a decimal string.
    pub sub: String,
    /// Email of the account at issuance.
    pub email: String,
    /// Issued at (seconds since epoch).
    pub iat: u64,
    /// Expiration time (seconds since epoch). Valid up to and including this
    /// second.
    pub exp: u64,
    /// Unique token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl IdentityClaims {
    /// Parses the subject as a [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Malformed`] if `sub` is not a decimal id.
    pub fn subject(&self) -> Result<UserId> {
        self.sub.parse().map_err(|_| AuthError::malformed("sub is not a user id"))
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        to_datetime(self.exp)
    }

    /// Issuance as a timestamp.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        to_datetime(self.iat)
    }

    /// Time left before expiry, measured from `now`. Zero once expired.
    #[must_use]
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.exp.saturating_sub(now))
    }
}

/// A freshly issued token together with the claims it carries.
#[derive(Clone)]
pub struct IssuedToken {
    /// The compact token string.
    pub token: String,
    /// The claims signed into `token`.
    pub claims: IdentityClaims,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Issues and verifies identity tokens.
///
/// Holds the derived HMAC keys and the validation policy. Immutable after
/// construction and safe to share across tasks behind an `Arc`.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Builds a codec from the configured secret and token lifetime.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.secret().expose();

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked by hand after the signature so the boundary second
        // is inclusive and `now` can be injected.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: config.token_ttl(),
        }
    }

    /// Lifetime given to newly issued tokens.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidInput`] if `sub` is empty or `exp` is not
    /// after `iat`.
    pub fn encode(&self, claims: &IdentityClaims) -> Result<String> {
        if claims.sub.is_empty() {
            return Err(AuthError::invalid_input("token subject must not be empty"));
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::invalid_input("token expiry must be after issuance"));
        }

        encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::configuration(format!("token signing failed: {e}")))
    }

    /// Issues a token for `subject` as of `now` (seconds since epoch).
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_at(&self, subject: UserId, email: &str, now: u64) -> Result<IssuedToken> {
        let claims = IdentityClaims {
            sub: subject.to_string(),
            email: email.to_owned(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
            jti: Some(new_token_id()),
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Issues a token for `subject` as of the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(&self, subject: UserId, email: &str) -> Result<IssuedToken> {
        self.issue_at(subject, email, unix_now())
    }

    /// Verifies `token` as of `now` (seconds since epoch).
    ///
    /// # Errors
    ///
    /// - [`AuthError::Malformed`] for structurally invalid input, missing
    ///   claims, or claims with `exp <= iat`
    /// - [`AuthError::BadSignature`] if the signature does not verify or the
    ///   header names another algorithm
    /// - [`AuthError::Expired`] if `now` is past `exp`
    pub fn verify_at(&self, token: &str, now: u64) -> Result<IdentityClaims> {
        if token.is_empty() {
            return Err(AuthError::malformed("empty token"));
        }

        let claims = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.sub.is_empty() {
            return Err(AuthError::malformed("empty subject"));
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::malformed("exp is not after iat"));
        }
        if now > claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    /// Verifies `token` as of the current time.
    ///
    /// # Errors
    ///
    /// See [`verify_at`](Self::verify_at).
    pub fn verify(&self, token: &str) -> Result<IdentityClaims> {
        self.verify_at(token, unix_now())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Current time in whole seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

fn to_datetime(secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn new_token_id() -> String {
    let mut bytes = [0u8; JTI_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
