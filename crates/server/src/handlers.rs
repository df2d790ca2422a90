//! Route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokengate_authn::{
    SessionProbe, TokenValidation,
    cookie::{clear_cookie, issue_cookie},
};
use tokengate_storage::{Zeroizing, users::UserProfile};

use crate::{
    error::ApiError,
    middleware::{Session, session_token},
    state::AppState,
};

/// `POST /login` body.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: Zeroizing<String>,
}

/// `POST /register` body.
#[derive(Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: Zeroizing<String>,
}

/// `POST /validate-token` body.
#[derive(Deserialize)]
pub struct ValidateTokenRequest {
    /// The token to inspect.
    pub token: String,
}

/// Body of plain success responses.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    /// Human-readable outcome.
    pub message: &'static str,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// `ok` or `unavailable`.
    pub status: &'static str,
}

/// `GET /health`: 200 while the storage backend answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    match state.backend().health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthBody { status: "ok" })),
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "unavailable" }))
        },
    }
}

/// `POST /login`: returns the session and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let outcome = state.session().login(&request.email, &request.password).await?;

    let cookie = issue_cookie(state.cookie(), &outcome.token, state.session().codec().ttl());
    Ok(([(header::SET_COOKIE, cookie)], Json(outcome)))
}

/// `POST /register`: creates an account without logging it in.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    state.session().register(&request.name, &request.email, &request.password).await?;

    Ok((StatusCode::CREATED, Json(MessageBody { message: "user created successfully" })))
}

/// `POST /validate-token`: reports token validity without admitting anything.
pub async fn validate_token(
    State(state): State<AppState>,
    payload: Result<Json<ValidateTokenRequest>, JsonRejection>,
) -> Result<Json<TokenValidation>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.session().validate_token(&request.token).await?))
}

/// `GET /verify-cookie-token`: best-effort session state. Always 200.
pub async fn verify_cookie_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionProbe> {
    let token = session_token(&headers, &state.cookie().name);
    Json(state.session().probe(token).await)
}

/// `POST /logout`: revokes the admitted token and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Session(ctx): Session,
) -> Result<impl IntoResponse, ApiError> {
    state.session().logout(&ctx.token).await.map_err(ApiError::LogoutFailed)?;

    Ok((
        [(header::SET_COOKIE, clear_cookie(state.cookie()))],
        Json(MessageBody { message: "successfully logged out" }),
    ))
}

/// `GET /me`: the current profile of the admitted subject.
pub async fn me(
    State(state): State<AppState>,
    Session(ctx): Session,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.session().get_identity(&ctx.token).await?))
}
