//! Tokengate - stateless bearer-token authentication.
//!
//! Issues signed tokens at login and authenticates every later request from
//! the token it carries, without any server-side session state.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod logging;

use crate::api::build_router;
use crate::auth::{Authenticator, InMemoryUserDirectory, RoutePolicy, SigningKey, TokenService};
use crate::config::Config;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token service and user directory.
    pub authenticator: Authenticator,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting Tokengate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        token_ttl_ms = config.auth.token_ttl_ms,
        "Configuration loaded"
    );

    // Resolve the signing key once; it is read-only from here on
    let key = SigningKey::from_base64(&config.auth.secret).map_err(|e| {
        tracing::error!(error = %e, "Invalid signing key");
        anyhow::anyhow!("Signing key error: {}", e)
    })?;

    let tokens = TokenService::new(key, config.auth.token_ttl_ms)?;
    let users = InMemoryUserDirectory::new(config.users.clone());
    if users.is_empty() {
        tracing::warn!("No users configured - every login will fail");
    } else {
        tracing::info!(users = users.len(), "User directory loaded");
    }
    let authenticator = Authenticator::new(tokens, Arc::new(users));
    let policy = RoutePolicy::new(&config.auth.public_paths);

    tracing::info!(
        public_paths = ?config.auth.public_paths,
        "Route policy configured"
    );

    let state = AppState { authenticator };
    let app = build_router(state, policy);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
