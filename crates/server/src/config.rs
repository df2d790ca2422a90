//! Server configuration.
//!
//! Loaded from environment variables by [`ServerConfig::from_env`] or
//! deserialized from JSON:
//!
//! ```json
//! {
//!   "listen_addr": "0.0.0.0:8080",
//!   "api_prefix": "/api",
//!   "auth": {
//!     "secret": "at-least-thirty-two-bytes-of-secret-material",
//!     "token_ttl": "24h",
//!     "sweep_interval": "1m",
//!     "cookie": { "secure": true, "same_site": "lax" }
//!   }
//! }
//! ```

use std::{net::SocketAddr, time::Duration};

use serde::Deserialize;
use tokengate_authn::{AuthConfig, AuthError, CookieConfig};

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 8080);

/// Default route prefix.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Environment variable holding the token signing secret.
pub const ENV_SECRET: &str = "TOKENGATE_SECRET";
/// Environment variable holding the listen address.
pub const ENV_LISTEN_ADDR: &str = "TOKENGATE_LISTEN_ADDR";
/// Environment variable holding the token lifetime (humantime, e.g. `24h`).
pub const ENV_TOKEN_TTL: &str = "TOKENGATE_TOKEN_TTL";
/// Environment variable toggling the cookie `Secure` attribute.
pub const ENV_COOKIE_SECURE: &str = "TOKENGATE_COOKIE_SECURE";
/// Environment variable holding the revocation sweep interval. `0s`
/// disables the sweeper.
pub const ENV_SWEEP_INTERVAL: &str = "TOKENGATE_SWEEP_INTERVAL";

/// Errors raised while assembling a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("{var}: {message}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// The API prefix is not a usable route prefix.
    #[error("api_prefix '{0}' must be empty or start with '/'")]
    Prefix(String),

    /// The authentication settings failed validation.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Top-level server configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Prefix under which every route is nested.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Token, cookie and sweeper settings.
    pub auth: AuthConfig,
}

fn default_listen_addr() -> SocketAddr {
    DEFAULT_LISTEN_ADDR
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_owned()
}

impl ServerConfig {
    /// Creates a configuration with default listener settings.
    #[must_use]
    pub fn new(auth: AuthConfig) -> Self {
        Self { listen_addr: DEFAULT_LISTEN_ADDR, api_prefix: default_api_prefix(), auth }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is missing or any variable is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup(ENV_SECRET).ok_or(ConfigError::Missing(ENV_SECRET))?;

        let listen_addr = match lookup(ENV_LISTEN_ADDR) {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: ENV_LISTEN_ADDR,
                message: e.to_string(),
            })?,
            None => DEFAULT_LISTEN_ADDR,
        };

        let token_ttl = lookup(ENV_TOKEN_TTL).map(|raw| parse_duration(ENV_TOKEN_TTL, &raw)).transpose()?;
        let sweep_interval =
            lookup(ENV_SWEEP_INTERVAL).map(|raw| parse_duration(ENV_SWEEP_INTERVAL, &raw)).transpose()?;

        let secure = match lookup(ENV_COOKIE_SECURE) {
            Some(raw) => parse_bool(ENV_COOKIE_SECURE, &raw)?,
            None => true,
        };

        let auth = AuthConfig::builder()
            .secret(secret)
            .maybe_token_ttl(token_ttl)
            .maybe_sweep_interval(sweep_interval)
            .cookie(CookieConfig::builder().secure(secure).build())
            .build()?;

        Ok(Self { listen_addr, api_prefix: default_api_prefix(), auth })
    }

    /// The route prefix without a trailing slash. Empty means routes are
    /// served from the root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Prefix`] if the prefix is non-empty and does
    /// not start with `/`.
    pub fn normalized_prefix(&self) -> Result<&str, ConfigError> {
        let prefix = self.api_prefix.trim_end_matches('/');
        if prefix.is_empty() || prefix.starts_with('/') {
            Ok(prefix)
        } else {
            Err(ConfigError::Prefix(self.api_prefix.clone()))
        }
    }
}

fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::Invalid { var, message: e.to_string() })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid { var, message: format!("'{other}' is not a boolean") }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "server-config-test-secret-0123456789";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_env() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_SECRET, SECRET)])).unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(86_400));
        assert!(config.auth.cookie().secure);
        assert_eq!(config.auth.sweep_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_overrides_from_env() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_SECRET, SECRET),
            (ENV_LISTEN_ADDR, "0.0.0.0:9000"),
            (ENV_TOKEN_TTL, "2h 30m"),
            (ENV_COOKIE_SECURE, "false"),
            (ENV_SWEEP_INTERVAL, "0s"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(9_000));
        assert!(!config.auth.cookie().secure);
        assert_eq!(config.auth.sweep_interval(), None);
    }

    #[test]
    fn test_missing_secret() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_SECRET)));
    }

    #[test]
    fn test_short_secret_is_auth_error() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_SECRET, "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::Auth(AuthError::Configuration(_))));
    }

    #[test]
    fn test_malformed_values() {
        for (var, value) in [
            (ENV_LISTEN_ADDR, "not-an-addr"),
            (ENV_TOKEN_TTL, "forever"),
            (ENV_COOKIE_SECURE, "maybe"),
        ] {
            let err = ServerConfig::from_lookup(lookup(&[(ENV_SECRET, SECRET), (var, value)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: v, .. } if v == var), "{var}: {err}");
        }
    }

    #[test]
    fn test_deserialize_json() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({
            "api_prefix": "/v1/",
            "auth": { "secret": SECRET, "token_ttl": "1h" }
        }))
        .unwrap();

        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.normalized_prefix().unwrap(), "/v1");
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(3_600));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = serde_json::from_value::<ServerConfig>(serde_json::json!({
            "auth": { "secret": SECRET },
            "listen": "0.0.0.0:1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_prefix_normalization() {
        let mut config = ServerConfig::from_lookup(lookup(&[(ENV_SECRET, SECRET)])).unwrap();
        for (raw, expected) in [("/api", "/api"), ("/api/", "/api"), ("/", ""), ("", "")] {
            config.api_prefix = raw.to_owned();
            assert_eq!(config.normalized_prefix().unwrap(), expected);
        }
        config.api_prefix = "api".to_owned();
        assert!(config.normalized_prefix().is_err());
    }
}
