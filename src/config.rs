//! Configuration module for Tokengate.
//!
//! Loads configuration from YAML files and environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::auth::DEFAULT_TOKEN_TTL_MS;
use crate::domain::Principal;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Users served by the in-memory directory.
    #[serde(default)]
    pub users: Vec<Principal>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Token and route policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Base64-encoded HMAC secret, at least 32 bytes once decoded.
    #[serde(default)]
    pub secret: String,
    /// Token lifetime in milliseconds.
    #[serde(default = "default_token_ttl_ms")]
    pub token_ttl_ms: i64,
    /// Path patterns reachable without authentication.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_token_ttl_ms() -> i64 {
    DEFAULT_TOKEN_TTL_MS
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/auth/**".to_string(),
        "/health".to_string(),
        "/api-docs/**".to_string(),
    ]
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKENGATE__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with TOKENGATE prefix
            .add_source(
                Environment::with_prefix("TOKENGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.secret must be set (TOKENGATE__AUTH__SECRET)".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_ms: default_token_ttl_ms(),
            public_paths: default_public_paths(),
        }
    }
}
