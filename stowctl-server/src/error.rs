//! Error types for stowctl-server startup and maintenance
//!
//! Request-level failures are modelled by [`crate::http::ApiError`]; this
//! type covers what can go wrong before or around serving.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
