//! Authentication middleware for axum.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{
    bearer_token, AuthOutcome, Authentication, AuthenticationDetails, Authenticator, RoutePolicy,
};

/// Error response for authentication failures.
#[derive(Debug, Serialize)]
pub struct AuthError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl AuthError {
    /// The single response used for every unauthenticated access.
    pub fn access_denied() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "Access denied".to_string(),
            code: "ACCESS_DENIED".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Populate the request's security context from a bearer token.
///
/// Never rejects. A missing, invalid or expired token, or an unknown user,
/// leaves the request unauthenticated; an existing authentication is kept.
pub async fn authenticate(
    State(authenticator): State<Authenticator>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return next.run(request).await;
    };

    if request.authentication().is_some() {
        tracing::trace!("request already authenticated, keeping existing context");
        return next.run(request).await;
    }

    let details = AuthenticationDetails {
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        path: request.uri().path().to_string(),
    };

    // Directory lookups may block; keep them off the async workers
    let resolver = authenticator.clone();
    let outcome = tokio::task::spawn_blocking(move || resolver.resolve(&token, details)).await;

    match outcome {
        Ok(AuthOutcome::Authenticated(auth)) => {
            tracing::debug!(
                username = %auth.username(),
                path = %auth.details.path,
                "Request authenticated"
            );
            request.extensions_mut().insert(auth);
        }
        Ok(AuthOutcome::Unauthenticated(reason)) => {
            tracing::debug!(
                reason = %reason,
                path = %request.uri().path(),
                "Bearer token rejected"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Authentication task failed");
        }
    }

    next.run(request).await
}

/// Reject requests to protected paths that carry no authentication.
pub async fn require_authenticated(
    State(policy): State<RoutePolicy>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path();

    if !policy.is_public(path) && request.authentication().is_none() {
        tracing::debug!(path = %path, "Unauthenticated access to protected route");
        return Err(AuthError::access_denied());
    }

    Ok(next.run(request).await)
}

/// Extension trait to read the authentication from a request.
pub trait AuthExtensions {
    fn authentication(&self) -> Option<&Authentication>;
}

impl<B> AuthExtensions for Request<B> {
    fn authentication(&self) -> Option<&Authentication> {
        self.extensions().get()
    }
}
