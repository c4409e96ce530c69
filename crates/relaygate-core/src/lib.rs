//! # relaygate Core
//!
//! Retry/backoff decisions for an upstream LLM messages client.
//!
//! ## Architecture
//!
//! ```text
//! relaygate-core/src/
//! ├── retry/        # classify + decide (pure), decision logging, retry executor
//! ├── credentials/  # credential pool with RAII leases and rotation
//! ├── upstream/     # reqwest adapter turning HTTP responses into attempt results
//! └── modules/      # config loading, logger setup
//! ```
//!
//! The engine in [`retry`] never sleeps and never touches the pool; the
//! executor owns both, so callers that only need decisions can use
//! [`retry::decide`] directly.

#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod credentials;
pub mod error;
pub mod modules;
pub mod retry;
pub mod upstream;

pub use credentials::{Credential, CredentialLease, CredentialPool};
pub use error::{AppError, AppResult};
pub use retry::{
    cancellation, decide, AttemptFailure, AttemptResult, CancelHandle, CancelSignal, Classifier,
    Execution, ExecutionError, RetryExecutor,
};
pub use upstream::UpstreamClient;
