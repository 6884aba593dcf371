//! services/api/src/config.rs
//!
//! Environment-driven configuration, resolved once at startup. A `.env`
//! file is honored for local development but never inside tests.

use std::net::SocketAddr;
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Everything the service reads from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Base URL of the alquran.cloud-compatible verse API.
    pub quran_api_base_url: String,
    /// Optional at load time so `bin/openapi` works without it; the server
    /// binary requires it at startup.
    pub openai_api_key: Option<String>,
    pub stt_model: String,
    /// Origin allowed by the CORS layer (the browser frontend).
    pub cors_origin: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Tests stay hermetic: no .env pollution.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_raw = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let level_raw = var_or("RUST_LOG", "INFO");
        let log_level = level_raw.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", level_raw),
            )
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            quran_api_base_url: var_or("QURAN_API_BASE_URL", "https://api.alquran.cloud/v1"),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            stt_model: var_or("STT_MODEL", "whisper-1"),
            cors_origin: var_or("CORS_ORIGIN", "http://localhost:3000"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Process environment is shared; one test owns all the env mutation.
    #[test]
    fn from_env_requires_database_url_and_fills_defaults() {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("BIND_ADDRESS");
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("QURAN_API_BASE_URL");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"
        ));

        std::env::set_var("DATABASE_URL", "postgres://localhost/test");
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.quran_api_base_url, "https://api.alquran.cloud/v1");
        assert_eq!(config.stt_model, "whisper-1");

        std::env::set_var("BIND_ADDRESS", "not an address");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(var, _)) if var == "BIND_ADDRESS"
        ));
        std::env::remove_var("BIND_ADDRESS");
        std::env::remove_var("DATABASE_URL");
    }
}
