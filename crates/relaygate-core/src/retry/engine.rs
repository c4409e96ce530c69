//! The decision function.

use relaygate_types::{AttemptOutcome, BackoffKind, Classification, RetryDecision, RetryPolicy};

/// Decide what to do after an attempt.
///
/// Total over its inputs and free of side effects. The policy is assumed to
/// have passed [`RetryPolicy::check`]; even when it has not, the result is
/// still well formed (delays saturate at the cap).
pub fn decide(outcome: &AttemptOutcome, policy: &RetryPolicy) -> RetryDecision {
    let classification = outcome.classification();

    if matches!(classification, Classification::Success | Classification::NonRetryable) {
        return RetryDecision::stop();
    }
    if outcome.attempt_index() >= policy.max_attempts {
        return RetryDecision::stop();
    }

    match classification {
        // Content-level failure: constant wait, same account.
        Classification::ClientSignatureFailure => RetryDecision {
            should_retry: true,
            delay_ms: policy.fixed_delay_ms,
            rotate_credential: false,
            backoff_kind: BackoffKind::Fixed,
        },
        // Overload is upstream-wide: keep the account.
        Classification::ServerOverload => RetryDecision {
            should_retry: true,
            delay_ms: exponential_delay_ms(outcome.attempt_index(), policy),
            rotate_credential: false,
            backoff_kind: BackoffKind::Exponential,
        },
        Classification::OtherRetryable => RetryDecision {
            should_retry: true,
            delay_ms: exponential_delay_ms(outcome.attempt_index(), policy),
            rotate_credential: true,
            backoff_kind: BackoffKind::Exponential,
        },
        Classification::Success | Classification::NonRetryable => RetryDecision::stop(),
    }
}

/// `min(max_backoff_ms, base_backoff_ms * multiplier^(attempt_index - 1))`.
///
/// Overflow and non-finite intermediate values saturate to the cap.
pub fn exponential_delay_ms(attempt_index: u32, policy: &RetryPolicy) -> u64 {
    let exponent = i32::try_from(attempt_index.saturating_sub(1)).unwrap_or(i32::MAX);
    let raw = policy.base_backoff_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let cap = policy.max_backoff_ms;

    if !raw.is_finite() || raw < 0.0 || raw >= cap as f64 {
        return cap;
    }
    (raw as u64).min(cap)
}
