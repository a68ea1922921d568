//! Authentication module for Tokengate.
//!
//! Stateless bearer-token authentication:
//! - Token service: issues and validates HS256 tokens
//! - Authenticator: resolves a token to a principal via the user directory
//! - Middleware: populates the per-request security context and enforces
//!   the public-route policy

mod authenticator;
mod context;
mod directory;
mod key;
mod middleware;
mod policy;
mod token;

pub use authenticator::*;
pub use context::*;
pub use directory::*;
pub use key::*;
pub use middleware::*;
pub use policy::*;
pub use token::*;
