//! Typed error definitions for relaygate.
//!
//! All errors are serializable (for CLI `--json` output), displayable for
//! logging, and matchable by variant.

mod config;
mod pool;

pub use config::ConfigError;
pub use pool::PoolError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Wraps a credential pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
