//! Decision logging.
//!
//! The log lines are derived from the decision after the fact; operators and
//! log-grepping harnesses match on these exact phrasings.

use relaygate_types::{AttemptOutcome, BackoffKind, Classification, RetryDecision};
use tracing::Level;

/// Render the log lines for one decision, in emission order.
pub fn decision_messages(
    outcome: &AttemptOutcome,
    decision: &RetryDecision,
    max_attempts: u32,
) -> Vec<(Level, String)> {
    let status = outcome.raw_status_code();
    let attempt = outcome.attempt_index();
    let classification = outcome.classification();

    if !decision.should_retry {
        return match classification {
            Classification::Success => Vec::new(),
            Classification::NonRetryable => {
                vec![(Level::DEBUG, format!("Non-retryable error {}, stopping", status))]
            },
            _ => vec![(
                Level::WARN,
                format!(
                    "Retries exhausted: status={}, attempt={}/{}",
                    status, attempt, max_attempts
                ),
            )],
        };
    }

    let mut lines = Vec::with_capacity(2);
    let backoff = match decision.backoff_kind {
        BackoffKind::Fixed => "fixed delay",
        BackoffKind::Exponential => "exponential backoff",
        BackoffKind::None => "no delay",
    };
    lines.push((
        Level::INFO,
        format!(
            "Retry with {}: status={}, attempt={}/{}, waiting={}ms",
            backoff, status, attempt, max_attempts, decision.delay_ms
        ),
    ));

    let rotation = if decision.rotate_credential {
        format!("Rotating account for status {} (account-specific failure)", status)
    } else if classification == Classification::ServerOverload {
        format!("Keeping same account for status {} (server-side issue)", status)
    } else {
        format!("Keeping same account for status {} (request content issue)", status)
    };
    lines.push((Level::INFO, rotation));
    lines
}

/// Emit the decision's log lines, prefixed with the trace id.
pub fn log_decision(
    trace_id: &str,
    outcome: &AttemptOutcome,
    decision: &RetryDecision,
    max_attempts: u32,
) {
    for (level, message) in decision_messages(outcome, decision, max_attempts) {
        match level {
            Level::WARN => tracing::warn!("[{}] {}", trace_id, message),
            Level::DEBUG => tracing::debug!("[{}] {}", trace_id, message),
            _ => tracing::info!("[{}] {}", trace_id, message),
        }
    }
}
