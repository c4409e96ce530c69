//! Attempt outcome: what the caller observed after one upstream attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Failure class assigned to an attempt by the classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// 2xx response
    Success,
    /// 400 whose body reports a signature/verification mismatch
    ClientSignatureFailure,
    /// 529 overload: the upstream is busy for everyone
    ServerOverload,
    /// Transient failure that may be tied to the credential in use
    OtherRetryable,
    /// Client error that cannot succeed on retry
    NonRetryable,
}

impl Classification {
    /// Stable snake_case name, used in tables and JSON output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientSignatureFailure => "client_signature_failure",
            Self::ServerOverload => "server_overload",
            Self::OtherRetryable => "other_retryable",
            Self::NonRetryable => "non_retryable",
        }
    }

    /// True for the three classes the engine may retry.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ClientSignatureFailure | Self::ServerOverload | Self::OtherRetryable)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed result of a single attempt.
///
/// Built fresh for every attempt. The attempt index is 1-based and stored as
/// `NonZeroU32`, so an index of zero cannot reach the decision engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptOutcome {
    classification: Classification,
    raw_status_code: u16,
    attempt_index: NonZeroU32,
}

impl AttemptOutcome {
    pub const fn new(
        classification: Classification,
        raw_status_code: u16,
        attempt_index: NonZeroU32,
    ) -> Self {
        Self { classification, raw_status_code, attempt_index }
    }

    /// Convenience constructor for callers holding a plain counter.
    /// Returns `None` for index 0.
    pub fn try_new(
        classification: Classification,
        raw_status_code: u16,
        attempt_index: u32,
    ) -> Option<Self> {
        NonZeroU32::new(attempt_index).map(|idx| Self::new(classification, raw_status_code, idx))
    }

    pub const fn classification(&self) -> Classification {
        self.classification
    }

    pub const fn raw_status_code(&self) -> u16 {
        self.raw_status_code
    }

    pub const fn attempt_index(&self) -> u32 {
        self.attempt_index.get()
    }
}
