//! Configuration management for the bakery operations server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with BAKERY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Token secret used when none is configured in development
pub const DEV_JWT_SECRET: &str = "development-secret-key";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,

    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret used to verify access tokens
    pub secret: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BAKERY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let mut builder = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?;
        if environment == "development" {
            builder = builder.set_default("jwt.secret", DEV_JWT_SECRET)?;
        }

        let config: Config = builder
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // BAKERY__DATABASE__URL, BAKERY__JWT__SECRET, ...
            .add_source(
                Environment::with_prefix("BAKERY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Outside development the token secret must be set and must not be
    /// the development one
    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_development() {
            return Ok(());
        }
        let secret = self.jwt.secret.trim();
        if secret.is_empty() || secret == DEV_JWT_SECRET {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be configured for the {} environment",
                self.environment
            )));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: &str, secret: &str) -> Config {
        Config {
            environment: environment.to_string(),
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/bakery".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            jwt: JwtConfig {
                secret: secret.to_string(),
            },
        }
    }

    #[test]
    fn test_development_accepts_default_secret() {
        assert!(config("development", DEV_JWT_SECRET).validate().is_ok());
    }

    #[test]
    fn test_production_requires_own_secret() {
        assert!(config("production", DEV_JWT_SECRET).validate().is_err());
        assert!(config("production", "  ").validate().is_err());
        assert!(config("production", "prod-secret").validate().is_ok());
    }
}
