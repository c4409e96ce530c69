//! Domain models shared by the engine, executor and CLI.

mod classifier;
mod config;
mod decision;
mod outcome;
mod policy;

pub use classifier::ClassifierConfig;
pub use config::{default_request_timeout, CredentialSpec, PoolConfig, RelayConfig, UpstreamConfig};
pub use decision::{BackoffKind, RetryDecision};
pub use outcome::{AttemptOutcome, Classification};
pub use policy::RetryPolicy;
