//! Session cookie formatting and parsing.
//!
//! Only the two `Set-Cookie` shapes the service emits and the lookup of one
//! name in a request `Cookie` header are supported. Header values are plain
//! strings so this module stays independent of any HTTP crate.

use std::{fmt::Write as _, time::Duration};

use crate::config::CookieConfig;

const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// `Set-Cookie` value carrying `token` for `max_age`.
///
/// ```
/// use std::time::Duration;
/// use tokengate_authn::{config::CookieConfig, cookie::issue_cookie};
///
/// let header = issue_cookie(&CookieConfig::default(), "tok", Duration::from_secs(86_400));
/// assert_eq!(header, "authToken=tok; Path=/; Max-Age=86400; HttpOnly; Secure");
/// ```
#[must_use]
pub fn issue_cookie(config: &CookieConfig, token: &str, max_age: Duration) -> String {
    let mut header = format!("{}={token}; Path={}; Max-Age={}", config.name, config.path, max_age.as_secs());
    push_flags(&mut header, config);
    header
}

/// `Set-Cookie` value instructing the client to drop the session cookie.
///
/// Emits both `Max-Age=0` and an epoch `Expires` so that clients honouring
/// either attribute discard the cookie.
#[must_use]
pub fn clear_cookie(config: &CookieConfig) -> String {
    let mut header =
        format!("{}=; Path={}; Max-Age=0; Expires={EPOCH_HTTP_DATE}", config.name, config.path);
    push_flags(&mut header, config);
    header
}

fn push_flags(header: &mut String, config: &CookieConfig) {
    if config.http_only {
        header.push_str("; HttpOnly");
    }
    if config.secure {
        header.push_str("; Secure");
    }
    if let Some(same_site) = config.same_site {
        let _ = write!(header, "; SameSite={}", same_site.as_str());
    }
}

/// Finds the value of cookie `name` in a `Cookie` request header.
///
/// The first pair whose name matches exactly wins. Surrounding double quotes
/// are stripped. An empty value is treated as absent.
#[must_use]
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| {
            let value = value.trim();
            value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
        })
        .filter(|value| !value.is_empty())
}
