//! Token issuance and validation.
//!
//! Tokens are compact HS256 JWTs carrying `sub`, `iat` and `exp` plus any
//! extension claims. Every read goes through signature verification first;
//! expiry is checked separately so an expired token still yields its subject.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::SigningKey;
use crate::domain::Principal;

/// Token lifetime used when none is configured (24 minutes).
pub const DEFAULT_TOKEN_TTL_MS: i64 = 1_440_000;

const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch or a structurally broken token.
    #[error("invalid token: {0}")]
    InvalidSignature(#[source] jsonwebtoken::errors::Error),

    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    #[error("token ttl must be at least 1000 ms, got {0}")]
    InvalidTtl(i64),
}

/// Claims carried in the token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiration (Unix timestamp, seconds).
    pub exp: i64,
    /// Extension claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Deserialize one extension claim. `None` if absent or of another type.
    #[allow(dead_code)]
    pub fn extra_claim<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.extra
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// True unless `now` is strictly before the expiration instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp.saturating_mul(1000)
    }
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues and validates signed tokens.
#[derive(Clone)]
pub struct TokenService {
    key: SigningKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    validation: Validation,
}

impl TokenService {
    /// Create a token service backed by the system clock.
    pub fn new(key: SigningKey, ttl_ms: i64) -> Result<Self, TokenError> {
        Self::with_clock(key, ttl_ms, Arc::new(SystemClock))
    }

    /// Create a token service reading time from `clock`.
    pub fn with_clock(
        key: SigningKey,
        ttl_ms: i64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        // iat/exp are whole seconds; anything shorter could collapse them.
        if ttl_ms < 1000 {
            return Err(TokenError::InvalidTtl(ttl_ms));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            key,
            ttl: Duration::milliseconds(ttl_ms),
            clock,
            validation,
        })
    }

    /// Configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `principal` with no extension claims.
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue_with_claims(principal, Map::new())
    }

    /// Issue a token for `principal`, merging `extra` into the payload.
    ///
    /// Reserved claim names in `extra` are dropped.
    pub fn issue_with_claims(
        &self,
        principal: &Principal,
        mut extra: Map<String, Value>,
    ) -> Result<String, TokenError> {
        for reserved in RESERVED_CLAIMS {
            extra.remove(reserved);
        }

        let now = self.clock.now();
        let exp = now + self.ttl;

        let claims = Claims {
            sub: principal.username.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            extra,
        };

        encode(&Header::new(Algorithm::HS256), &claims, self.key.encoding())
            .map_err(TokenError::Encoding)
    }

    /// Verify the signature and return the subject. Expiry is not checked.
    pub fn parse_subject(&self, token: &str) -> Result<String, TokenError> {
        self.get_claim(token, |claims| claims.sub.clone())
    }

    /// Verify the signature and project a value out of the claims.
    pub fn get_claim<T, F>(&self, token: &str, selector: F) -> Result<T, TokenError>
    where
        F: FnOnce(&Claims) -> T,
    {
        let claims = self.verified_claims(token)?;
        Ok(selector(&claims))
    }

    /// Whether `token` names `principal` and has not yet expired.
    ///
    /// An expired token yields `Ok(false)`; a tampered or malformed one
    /// yields `Err(InvalidSignature)`.
    pub fn is_valid(&self, token: &str, principal: &Principal) -> Result<bool, TokenError> {
        let claims = self.verified_claims(token)?;
        Ok(claims.sub == principal.username && !claims.is_expired_at(self.clock.now()))
    }

    fn verified_claims(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, self.key.decoding(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                TokenError::InvalidSignature(e)
            })
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    millis: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service_with_ttl(ttl_ms: i64) -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let key = SigningKey::from_bytes(SECRET).unwrap();
        let service = TokenService::with_clock(key, ttl_ms, clock.clone()).unwrap();
        (service, clock)
    }

    fn alice() -> Principal {
        Principal::new("alice", "hash", ["ROLE_USER"])
    }

    #[test]
    fn test_issued_token_is_valid() {
        for ttl in [1_000, 60_000, DEFAULT_TOKEN_TTL_MS, 86_400_000] {
            let (service, _) = service_with_ttl(ttl);
            let token = service.issue(&alice()).unwrap();

            assert_eq!(token.split('.').count(), 3);
            assert!(service.is_valid(&token, &alice()).unwrap(), "ttl {ttl}");
            assert_eq!(service.parse_subject(&token).unwrap(), "alice");
        }
    }

    #[test]
    fn test_token_for_other_principal_is_invalid() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let token = service.issue(&alice()).unwrap();

        let bob = Principal::new("bob", "hash", ["ROLE_USER"]);
        assert!(!service.is_valid(&token, &bob).unwrap());

        // No case folding
        let upper = Principal::new("ALICE", "hash", ["ROLE_USER"]);
        assert!(!service.is_valid(&token, &upper).unwrap());
    }

    #[test]
    fn test_token_expires_after_ttl() {
        for ttl in [1_000, 5_500, DEFAULT_TOKEN_TTL_MS] {
            let (service, clock) = service_with_ttl(ttl);
            let token = service.issue(&alice()).unwrap();
            assert!(service.is_valid(&token, &alice()).unwrap());

            clock.advance(Duration::milliseconds(ttl + 1));

            assert!(!service.is_valid(&token, &alice()).unwrap(), "ttl {ttl}");
            // Signature is still good, so the subject is still readable
            assert_eq!(service.parse_subject(&token).unwrap(), "alice");
        }
    }

    #[test]
    fn test_issued_at_precedes_expiration() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let token = service.issue(&alice()).unwrap();

        let (iat, exp) = service.get_claim(&token, |c| (c.iat, c.exp)).unwrap();
        assert!(iat < exp);
        assert_eq!(exp - iat, DEFAULT_TOKEN_TTL_MS / 1000);

        let claims = service.get_claim(&token, Claims::clone).unwrap();
        assert!(claims.issued_at().unwrap() < claims.expiration().unwrap());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let token = service.issue(&alice()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                matches!(
                    service.parse_subject(&tampered),
                    Err(TokenError::InvalidSignature(_))
                ),
                "byte {i} flipped"
            );
            assert!(service.is_valid(&tampered, &alice()).is_err());
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let token = service.issue(&alice()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = serde_json::json!({ "sub": "mallory", "iat": 0, "exp": i64::MAX / 1000 });
        let forged_payload = URL_SAFE_NO_PAD.encode(forged.to_string());
        let forged_token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            service.parse_subject(&forged_token),
            Err(TokenError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let other_key = SigningKey::from_bytes(&[9u8; 32]).unwrap();
        let other = TokenService::new(other_key, DEFAULT_TOKEN_TTL_MS).unwrap();

        let token = other.issue(&alice()).unwrap();
        assert!(matches!(
            service.is_valid(&token, &alice()),
            Err(TokenError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);

        for token in ["", "abc", "a.b.c", "a.b", "...."] {
            assert!(
                matches!(service.parse_subject(token), Err(TokenError::InvalidSignature(_))),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"alice","iat":0,"exp":9999999999}"#);
        let token = format!("{header}.{payload}.");

        assert!(service.parse_subject(&token).is_err());
    }

    #[test]
    fn test_extra_claims_merged() {
        let (service, _) = service_with_ttl(DEFAULT_TOKEN_TTL_MS);
        let mut extra = Map::new();
        extra.insert("tenant".to_string(), Value::from("acme"));
        extra.insert("level".to_string(), Value::from(3));
        extra.insert("sub".to_string(), Value::from("mallory"));

        let token = service.issue_with_claims(&alice(), extra).unwrap();

        assert_eq!(service.parse_subject(&token).unwrap(), "alice");
        let tenant: Option<String> = service
            .get_claim(&token, |c| c.extra_claim("tenant"))
            .unwrap();
        assert_eq!(tenant.as_deref(), Some("acme"));
        let level: Option<u32> = service.get_claim(&token, |c| c.extra_claim("level")).unwrap();
        assert_eq!(level, Some(3));
        let missing: Option<String> = service.get_claim(&token, |c| c.extra_claim("nope")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_sub_second_ttl_rejected() {
        let key = SigningKey::from_bytes(SECRET).unwrap();
        assert!(matches!(
            TokenService::new(key, 999),
            Err(TokenError::InvalidTtl(999))
        ));
    }
}
