//! User lookup used by authentication.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::Principal;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    NotFound(String),
}

/// Resolves a username to a principal.
///
/// Implementations are called from the blocking pool, so they may perform
/// synchronous I/O.
pub trait UserDirectory: Send + Sync {
    fn load_by_username(&self, username: &str) -> Result<Principal, DirectoryError>;
}

/// In-memory user directory populated from configuration.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, Principal>,
}

impl InMemoryUserDirectory {
    /// Create a directory from configured users. Later duplicates win.
    pub fn new(users: Vec<Principal>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.username.clone(), u))
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn load_by_username(&self, username: &str) -> Result<Principal, DirectoryError> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(username.to_string()))
    }
}
