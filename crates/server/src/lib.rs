//! # Tokengate Server
//!
//! HTTP surface over [`tokengate_authn`].
//!
//! ```text
//! {prefix}
//! ├── GET  /health               storage health
//! ├── POST /login                issue token + Set-Cookie
//! ├── POST /register             create account (201)
//! ├── POST /validate-token       token metadata
//! ├── GET  /verify-cookie-token  best-effort session probe (always 200)
//! ├── POST /logout               gated: revoke + clear cookie
//! └── GET  /me                   gated: current profile
//! ```
//!
//! Gated routes run behind [`require_session`], which admits the session
//! cookie through the [`RequestGate`](tokengate_authn::RequestGate) and
//! attaches an [`AuthContext`](tokengate_authn::AuthContext) read by the
//! [`Session`] extractor.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use middleware::{Session, require_session};
pub use state::AppState;

/// Builds the application router, nesting every route under `prefix`.
///
/// An empty `prefix` serves routes from the root. Use
/// [`ServerConfig::normalized_prefix`] to obtain a valid one.
pub fn router(state: AppState, prefix: &str) -> Router {
    let gated = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/validate-token", post(handlers::validate_token))
        .route("/verify-cookie-token", get(handlers::verify_cookie_token))
        .merge(gated)
        .with_state(state);

    if prefix.is_empty() { api } else { Router::new().nest(prefix, api) }
}
