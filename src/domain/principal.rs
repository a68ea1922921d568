//! Principal domain type.
//!
//! A principal is the identity a token resolves to: a username plus the
//! authorities it carries. Account flags travel with it but are only
//! consulted at login.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// An identity known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique username. Compared byte for byte.
    pub username: String,
    /// Password hash (SHA256 hex).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Granted authority labels, e.g. `ROLE_USER`.
    #[serde(default)]
    pub authorities: BTreeSet<String>,
    /// Whether the account is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the account is locked.
    #[serde(default)]
    pub locked: bool,
}

fn default_true() -> bool {
    true
}

impl Principal {
    /// Create an enabled, unlocked principal.
    #[allow(dead_code)]
    pub fn new<I, S>(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        authorities: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
            enabled: true,
            locked: false,
        }
    }

    /// Hash a password the same way stored hashes are produced.
    pub fn hash_password(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify a password against the stored hash in constant time.
    pub fn verify_password(&self, password: &str) -> bool {
        let computed = Self::hash_password(password);
        computed
            .as_bytes()
            .ct_eq(self.password_hash.as_bytes())
            .into()
    }

    /// Whether the account may log in.
    pub fn can_login(&self) -> bool {
        self.enabled && !self.locked
    }
}
