//! Per-request security context.
//!
//! The authentication result lives in the request's extension map, so it is
//! created with the request and dropped with it. Handlers read it through
//! the [`SecurityContext`] or [`CurrentUser`] extractors.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::AuthError;
use crate::domain::Principal;

/// Request metadata captured when authentication succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationDetails {
    /// Peer address, when the server exposes connect info.
    pub remote_addr: Option<SocketAddr>,
    /// Request path.
    pub path: String,
}

/// An authenticated principal bound to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub principal: Principal,
    pub authorities: BTreeSet<String>,
    pub details: AuthenticationDetails,
}

impl Authentication {
    pub fn new(principal: Principal, details: AuthenticationDetails) -> Self {
        let authorities = principal.authorities.clone();
        Self {
            principal,
            authorities,
            details,
        }
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }
}

/// The current request's authentication, if any.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext(pub Option<Authentication>);

impl SecurityContext {
    pub fn authentication(&self) -> Option<&Authentication> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SecurityContext(parts.extensions.get::<Authentication>().cloned()))
    }
}

/// Extractor that requires an authenticated request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Authentication);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authentication>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(AuthError::access_denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn authentication() -> Authentication {
        Authentication::new(
            Principal::new("alice", "hash", ["ROLE_USER"]),
            AuthenticationDetails {
                remote_addr: Some("127.0.0.1:4000".parse().unwrap()),
                path: "/me".to_string(),
            },
        )
    }

    #[test]
    fn test_authorities_copied_from_principal() {
        let auth = authentication();
        assert_eq!(auth.username(), "alice");
        assert!(auth.authorities.contains("ROLE_USER"));
    }

    #[tokio::test]
    async fn test_security_context_empty_without_authentication() {
        let (mut parts, _) = Request::new(()).into_parts();
        let SecurityContext(auth) = SecurityContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(auth.is_none());

        assert!(CurrentUser::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_extractors_read_extensions() {
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(authentication());

        let context = SecurityContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(context.is_authenticated());

        let CurrentUser(auth) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(auth, authentication());
    }
}
