//! # Engine Error Types
//!
//! Operations return [`CoreError`](carlot_core::CoreError). This module only
//! covers what can go wrong before the services exist: loading configuration
//! and opening the store.

use thiserror::Error;

/// Startup failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Secret or signature settings rejected by the verifier.
    #[error("Invalid payment settings: {0}")]
    Payment(#[from] carlot_core::ValidationError),

    #[error("Failed to build gateway client: {0}")]
    Gateway(String),

    #[error("Failed to open database: {0}")]
    Database(#[from] carlot_db::DbError),
}

/// Result type for configuration and startup.
pub type ConfigResult<T> = Result<T, ConfigError>;
