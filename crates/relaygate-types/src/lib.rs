//! # relaygate Types
//!
//! Core types, models, and error definitions for relaygate.
//!
//! - **`error`** - Typed error hierarchy for configuration and the credential pool
//! - **`models`** - Retry policy, attempt outcome, retry decision, relay configuration
//!
//! ## Architecture Role
//!
//! `relaygate-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        relaygate-types (this crate)
//!                │
//!                ▼
//!          relaygate-core
//!                │
//!                ▼
//!          relaygate-cli
//! ```
//!
//! Everything here is plain data: serializable via serde, `Clone`, and
//! comparable for tests. No type in this crate performs I/O.

pub mod error;
pub mod models;

pub use error::{ConfigError, PoolError, Result, TypedError};

pub use models::{
    AttemptOutcome, BackoffKind, Classification, ClassifierConfig, CredentialSpec, PoolConfig,
    RelayConfig, RetryDecision, RetryPolicy, UpstreamConfig,
};
