//! Credential pool errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when a credential cannot be checked out.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum PoolError {
    /// No credentials are configured at all
    #[error("Credential pool is empty")]
    Empty,

    /// Every credential is at its in-flight limit
    #[error("All {total} credentials are at max concurrency")]
    AllBusy {
        /// Number of credentials in the pool
        total: usize,
    },

    /// Duplicate credential id while building the pool
    #[error("Duplicate credential id: {id}")]
    Duplicate {
        /// Identifier that appeared twice
        id: String,
    },
}
