//! Turns a bearer token into an authenticated principal.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

use crate::auth::{
    Authentication, AuthenticationDetails, DirectoryError, TokenService, UserDirectory,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Why a presented token did not authenticate the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expired token")]
    ExpiredToken,
    #[error("unknown user")]
    UnknownUser,
}

/// Result of resolving a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Authentication),
    Unauthenticated(AuthFailure),
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-sensitively with exactly one trailing space.
/// Any other scheme, or a header that is not visible ASCII, yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
}

/// Token service plus user directory, shared by every request.
#[derive(Clone)]
pub struct Authenticator {
    tokens: TokenService,
    users: Arc<dyn UserDirectory>,
}

impl Authenticator {
    pub fn new(tokens: TokenService, users: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, users }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    /// Resolve `token` to an authentication. Never fails; every problem
    /// becomes [`AuthOutcome::Unauthenticated`].
    pub fn resolve(&self, token: &str, details: AuthenticationDetails) -> AuthOutcome {
        let username = match self.tokens.parse_subject(token) {
            Ok(username) => username,
            Err(_) => return AuthOutcome::Unauthenticated(AuthFailure::InvalidSignature),
        };

        let principal = match self.users.load_by_username(&username) {
            Ok(principal) => principal,
            Err(DirectoryError::NotFound(_)) => {
                return AuthOutcome::Unauthenticated(AuthFailure::UnknownUser)
            }
        };

        // Subject already matches, so a `false` here means expiry.
        match self.tokens.is_valid(token, &principal) {
            Ok(true) => AuthOutcome::Authenticated(Authentication::new(principal, details)),
            Ok(false) => AuthOutcome::Unauthenticated(AuthFailure::ExpiredToken),
            Err(_) => AuthOutcome::Unauthenticated(AuthFailure::InvalidSignature),
        }
    }
}
