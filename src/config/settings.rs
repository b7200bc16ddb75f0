//! Application settings loaded from `config.toml` and the environment.
//!
//! Every field has a default, so a missing file is not an error. Environment
//! variables (`DATABASE_URL`, `BIND_ADDR`, `SUPABASE_JWT_SECRET`) win over the
//! file, which lets deployments keep secrets out of it.

use super::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration structure representing `config.toml`
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Session token verification settings
    pub auth: AuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:3000"`
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Session token verification settings
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: Option<String>,
}

impl AppConfig {
    /// Returns the JWT secret or a configuration error if none was provided.
    pub fn require_jwt_secret(&self) -> Result<&str> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config {
                message: "SUPABASE_JWT_SECRET is not set".to_string(),
            })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Ok(secret) = std::env::var("SUPABASE_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
    }
}

/// Parses configuration from a TOML string.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML syntax is invalid or a field has the
/// wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `path`, falling back to defaults when the file is
/// absent, then applies environment overrides.
///
/// # Errors
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        debug!(?path, "loading configuration file");
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read config file: {e}"),
        })?;
        parse_config(&contents)?
    } else {
        info!(?path, "no configuration file found, using defaults");
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Loads configuration from the default location (`./config.toml`).
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_addr = "127.0.0.1:8080"

            [database]
            url = "sqlite::memory:"

            [auth]
            jwt_secret = "shh"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.require_jwt_secret().unwrap(), "shh");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("[server]\nbind_addr = \"127.0.0.1:1\"\n").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:1");
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let config = AppConfig::default();
        assert!(matches!(
            config.require_jwt_secret(),
            Err(Error::Config { message: _ })
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[server\nbind_addr = 1");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
