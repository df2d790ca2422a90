//! Request gate middleware and the typed session extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tokengate_authn::{AuthContext, cookie::find_cookie};

use crate::{error::ApiError, state::AppState};

/// Session token from the request's `Cookie` headers, if any.
///
/// Browsers may split cookies across several headers; the first match wins.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| find_cookie(value, cookie_name))
}

/// Admits the request through the gate and attaches its [`AuthContext`].
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for every rejection.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(request.headers(), &state.cookie().name).map(str::to_owned);
    let ctx = state.session().gate().admit(token.as_deref()).await?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Extractor for the context attached by [`require_session`].
///
/// Yields 401 on routes the middleware does not cover.
#[derive(Clone, Debug)]
pub struct Session(pub AuthContext);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().map(Session).ok_or_else(|| {
            tracing::warn!("session extractor used on a route without the gate");
            ApiError::Unauthorized
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_session_token_from_cookie_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers, "authToken"), None);

        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("authToken=abc; lang=en"));
        assert_eq!(session_token(&headers, "authToken"), Some("abc"));
    }

    #[test]
    fn test_authorization_header_is_not_a_session() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(session_token(&headers, "authToken"), None);
    }
}
