//! Authentication configuration.
//!
//! [`AuthConfig`] is built once at startup and shared read-only by every
//! component. Construction goes through a validating builder; deserialization
//! is routed through the same builder so a config file can never produce a
//! value the builder would reject.
//!
//! ```
//! use std::time::Duration;
//! use tokengate_authn::config::AuthConfig;
//!
//! let config = AuthConfig::builder()
//!     .secret("an-example-secret-that-is-at-least-32-bytes")
//!     .token_ttl(Duration::from_secs(3600))
//!     .build()?;
//!
//! assert_eq!(config.token_ttl(), Duration::from_secs(3600));
//! assert_eq!(config.cookie().name, "authToken");
//! # Ok::<(), tokengate_authn::AuthError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default interval between revocation sweeps (60 seconds).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "authToken";

/// HMAC signing secret.
///
/// The bytes are scrubbed on drop and never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    /// Raw key bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

impl From<Vec<u8>> for SecretKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl From<&[u8]> for SecretKey {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl From<String> for SecretKey {
    fn from(secret: String) -> Self {
        Self::from(secret.into_bytes())
    }
}

impl From<&str> for SecretKey {
    fn from(secret: &str) -> Self {
        Self::from(secret.as_bytes())
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Zeroizing::new(String::deserialize(deserializer)?);
        Ok(Self::from(raw.as_bytes()))
    }
}

/// `SameSite` cookie attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Sent only on same-site requests.
    Strict,
    /// Sent on same-site requests and top-level cross-site navigation.
    Lax,
    /// Sent on all requests. Browsers require `Secure` alongside it.
    None,
}

impl SameSite {
    /// Attribute value as written in `Set-Cookie`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes of the session cookie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(default, deny_unknown_fields)]
pub struct CookieConfig {
    /// Cookie name.
    #[builder(into, default = DEFAULT_COOKIE_NAME.to_owned())]
    pub name: String,

    /// `Path` attribute.
    #[builder(into, default = "/".to_owned())]
    pub path: String,

    /// Emit the `Secure` attribute.
    #[builder(default = true)]
    pub secure: bool,

    /// Emit the `HttpOnly` attribute.
    #[builder(default = true)]
    pub http_only: bool,

    /// Optional `SameSite` attribute.
    pub same_site: Option<SameSite>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_owned(),
            path: "/".to_owned(),
            secure: true,
            http_only: true,
            same_site: None,
        }
    }
}

impl CookieConfig {
    fn validate(&self) -> Result<()> {
        let name_ok = !self.name.is_empty()
            && !self.name.chars().any(|c| c.is_whitespace() || c.is_control() || ";=,".contains(c));
        if !name_ok {
            return Err(AuthError::configuration(format!(
                "cookie name '{}' is not a valid cookie token",
                self.name
            )));
        }
        if !self.path.starts_with('/') || self.path.contains(';') {
            return Err(AuthError::configuration(format!(
                "cookie path '{}' must start with '/' and contain no ';'",
                self.path
            )));
        }
        Ok(())
    }
}

/// Configuration shared by the token codec, session service and server.
///
/// # Validation
///
/// - `secret` must be at least [`MIN_SECRET_LEN`] bytes
/// - `token_ttl` must be at least one second
/// - `cookie.name` must be a valid cookie token
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "AuthConfigFile")]
pub struct AuthConfig {
    secret: SecretKey,
    token_ttl: Duration,
    cookie: CookieConfig,
    sweep_interval: Duration,
}

#[bon::bon]
impl AuthConfig {
    /// Creates a validated configuration.
    ///
    /// A zero `sweep_interval` disables the background revocation sweeper.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if any field fails validation.
    #[builder]
    pub fn new(
        #[builder(into)] secret: SecretKey,
        #[builder(default = DEFAULT_TOKEN_TTL)] token_ttl: Duration,
        #[builder(default)] cookie: CookieConfig,
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
    ) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::configuration(format!(
                "secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }
        // Claims carry whole seconds, so a sub-second TTL would yield exp == iat.
        if token_ttl.as_secs() == 0 {
            return Err(AuthError::configuration("token_ttl must be at least one second"));
        }
        cookie.validate()?;

        Ok(Self { secret, token_ttl, cookie, sweep_interval })
    }

    /// The signing secret.
    #[must_use]
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Session cookie attributes.
    #[must_use]
    pub fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }

    /// Revocation sweep interval, or `None` when sweeping is disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (!self.sweep_interval.is_zero()).then_some(self.sweep_interval)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthConfigFile {
    secret: SecretKey,
    #[serde(with = "humantime_serde", default = "default_token_ttl")]
    token_ttl: Duration,
    #[serde(default)]
    cookie: CookieConfig,
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    sweep_interval: Duration,
}

fn default_token_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

impl TryFrom<AuthConfigFile> for AuthConfig {
    type Error = AuthError;

    fn try_from(file: AuthConfigFile) -> Result<Self> {
        AuthConfig::builder()
            .secret(file.secret)
            .token_ttl(file.token_ttl)
            .cookie(file.cookie)
            .sweep_interval(file.sweep_interval)
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = AuthConfig::builder().secret(SECRET).build().unwrap();
        assert_eq!(config.token_ttl(), DEFAULT_TOKEN_TTL);
        assert_eq!(config.sweep_interval(), Some(DEFAULT_SWEEP_INTERVAL));
        assert_eq!(config.cookie(), &CookieConfig::default());
        assert_eq!(config.secret().expose(), SECRET.as_bytes());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = AuthConfig::builder().secret("too-short").build().unwrap_err();
        assert!(matches!(err, AuthError::Configuration(ref msg) if msg.contains("at least 32")));
    }

    #[test]
    fn test_sub_second_ttl_rejected() {
        let result =
            AuthConfig::builder().secret(SECRET).token_ttl(Duration::from_millis(500)).build();
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_zero_sweep_interval_disables_sweeper() {
        let config =
            AuthConfig::builder().secret(SECRET).sweep_interval(Duration::ZERO).build().unwrap();
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_invalid_cookie_names_rejected() {
        for name in ["", "auth token", "auth;token", "a=b", "a,b"] {
            let cookie = CookieConfig::builder().name(name).build();
            let result = AuthConfig::builder().secret(SECRET).cookie(cookie).build();
            assert!(result.is_err(), "cookie name {name:?} should be rejected");
        }
    }

    #[test]
    fn test_cookie_path_must_be_absolute() {
        let cookie = CookieConfig::builder().path("api").build();
        assert!(AuthConfig::builder().secret(SECRET).cookie(cookie).build().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::builder().secret(SECRET).build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_deserialize_with_humantime_durations() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "secret": SECRET,
            "token_ttl": "2h",
            "sweep_interval": "30s",
            "cookie": { "secure": false, "same_site": "lax" }
        }))
        .unwrap();

        assert_eq!(config.token_ttl(), Duration::from_secs(7200));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(30)));
        assert!(!config.cookie().secure);
        assert_eq!(config.cookie().same_site, Some(SameSite::Lax));
        assert_eq!(config.cookie().name, DEFAULT_COOKIE_NAME);
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let result: std::result::Result<AuthConfig, _> =
            serde_json::from_value(serde_json::json!({ "secret": "short" }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least 32"), "unexpected error: {err}");
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: std::result::Result<AuthConfig, _> = serde_json::from_value(
            serde_json::json!({ "secret": SECRET, "token_lifetime": "1h" }),
        );
        assert!(result.is_err());
    }
}
