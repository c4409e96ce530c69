//! Retry decision engine.
//!
//! `classify` turns a status code and error body into a [`Classification`],
//! `decide` turns an [`AttemptOutcome`] plus [`RetryPolicy`] into a
//! [`RetryDecision`]. Both are pure. The executor wires them to a credential
//! pool, tokio sleeps and cancellation.
//!
//! [`Classification`]: relaygate_types::Classification
//! [`AttemptOutcome`]: relaygate_types::AttemptOutcome
//! [`RetryPolicy`]: relaygate_types::RetryPolicy
//! [`RetryDecision`]: relaygate_types::RetryDecision

mod classify;
mod engine;
mod executor;
mod log;

pub use classify::{classify_transport, Classifier};
pub use engine::{decide, exponential_delay_ms};
pub use executor::{
    cancellation, generate_trace_id, AttemptFailure, AttemptResult, CancelHandle, CancelSignal,
    Execution, ExecutionError, RetryExecutor,
};
pub use log::{decision_messages, log_decision};

/// Overload status: the upstream is busy for every caller.
pub const STATUS_OVERLOADED: u16 = 529;

/// 4xx codes that may succeed on another attempt or another credential.
pub const KNOWN_RETRYABLE_CLIENT_CODES: &[u16] = &[401, 403, 408, 429];

/// Status recorded for attempts that never got an HTTP response.
pub const TRANSPORT_STATUS: u16 = 0;

#[cfg(test)]
mod executor_tests;
