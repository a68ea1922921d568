//! HTTP request handlers.

use axum::{extract::State, Json};

use crate::api::types::*;
use crate::auth::{Claims, CurrentUser, SecurityContext};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Health check endpoint.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ==================== Authentication Endpoints ====================

/// Login to obtain a bearer token.
///
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if request.username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }

    let authenticator = state.authenticator.clone();
    let username = request.username.clone();
    let lookup =
        tokio::task::spawn_blocking(move || authenticator.users().load_by_username(&username))
            .await
            .map_err(|e| AppError::Internal(format!("User lookup failed: {}", e)))?;

    let principal = lookup
        .ok()
        .filter(|user| user.can_login() && user.verify_password(&request.password))
        .ok_or_else(|| {
            tracing::warn!(username = %request.username, "Failed login attempt");
            AppError::Unauthorized("Invalid username or password".to_string())
        })?;

    let tokens = state.authenticator.tokens();
    let token = tokens.issue(&principal)?;
    let (issued_at, expires_at) =
        tokens.get_claim(&token, |claims: &Claims| (claims.issued_at(), claims.expiration()))?;

    tracing::info!(
        username = %principal.username,
        authorities = ?principal.authorities,
        "User logged in"
    );

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in_ms: tokens.ttl().num_milliseconds(),
        issued_at,
        expires_at,
        username: principal.username,
    }))
}

/// Get the authenticated caller.
///
/// GET /me
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user info", body = CurrentUserResponse),
        (status = 403, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn current_user(CurrentUser(auth): CurrentUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        username: auth.principal.username,
        authorities: auth.authorities.into_iter().collect(),
        remote_addr: auth.details.remote_addr.map(|addr| addr.to_string()),
        path: auth.details.path,
    })
}

/// Report whether the request authenticated, without requiring it.
///
/// GET /auth/session
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Authentication state of the caller", body = SessionResponse)
    ),
    tag = "auth"
)]
pub async fn session_status(context: SecurityContext) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: context.is_authenticated(),
        username: context
            .authentication()
            .map(|auth| auth.username().to_string()),
    })
}
