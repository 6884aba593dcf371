//! services/api/src/error.rs

use crate::config::ConfigError;
use quran_tracker_core::ports::PortError;

/// Top-level error for the `api` service binaries. Handlers respond with
/// `(StatusCode, String)` directly; this type covers startup and the
/// infrastructure paths where statuses make no sense.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("service port: {0}")]
    Port(#[from] PortError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("websocket: {0}")]
    Websocket(#[from] axum::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal: {0}")]
    Internal(String),
}
