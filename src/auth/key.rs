//! HMAC signing key shared by every token operation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

/// Minimum key length for HS256, in bytes.
pub const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing key must be at least {MIN_KEY_BYTES} bytes, got {0}")]
    TooShort(usize),

    #[error("signing key is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// Symmetric key used to sign and verify tokens.
///
/// Built once at startup and never mutated; cloning only copies the
/// derived key material.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Derive the key pair from raw secret bytes.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() < MIN_KEY_BYTES {
            return Err(KeyError::TooShort(secret.len()));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// Derive the key pair from a base64-encoded secret.
    pub fn from_base64(secret: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD.decode(secret.trim())?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}
