//! HTTP API layer for Tokengate.
//!
//! Provides the login endpoint and a small set of routes guarded by the
//! authentication middleware.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
