//! Retry decision returned by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shape of the wait before the next attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// No retry, so no wait
    #[default]
    None,
    /// Constant wait independent of the attempt index
    Fixed,
    /// Wait grows by the policy multiplier per attempt, up to the cap
    Exponential,
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::None => write!(f, "none"),
            Self::Fixed => write!(f, "fixed"),
            Self::Exponential => write!(f, "exponential"),
        }
    }
}

/// What the caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay_ms: u64,
    pub rotate_credential: bool,
    pub backoff_kind: BackoffKind,
}

impl RetryDecision {
    /// Terminal decision: no retry, no wait, keep the credential.
    pub const fn stop() -> Self {
        Self {
            should_retry: false,
            delay_ms: 0,
            rotate_credential: false,
            backoff_kind: BackoffKind::None,
        }
    }

    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
