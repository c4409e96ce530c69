//! Unified error types for relaygate Core.

use relaygate_types::{ConfigError, PoolError, TypedError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for fallible relaygate operations.
///
/// Retry decisions are not in here: deciding cannot fail. Executor terminal
/// outcomes live in [`crate::retry::ExecutionError`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network client could not be built.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Credential pool construction or checkout failed.
    #[error("{0}")]
    Pool(#[from] PoolError),

    /// Logger could not be installed.
    #[error("Logger error: {0}")]
    Logger(String),
}

impl From<TypedError> for AppError {
    fn from(e: TypedError) -> Self {
        match e {
            TypedError::Config(c) => Self::Config(c),
            TypedError::Pool(p) => Self::Pool(p),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for relaygate operations.
pub type AppResult<T> = Result<T, AppError>;
