//! Retry policy configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::ConfigError;

/// Backoff and budget settings for the retry engine.
///
/// These five options are the only tuning knobs; unknown keys are rejected
/// when the policy is deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts per logical request, including the first
    #[validate(range(min = 1_u32))]
    pub max_attempts: u32,
    /// Wait used for signature failures
    pub fixed_delay_ms: u64,
    /// First exponential wait (attempt 1)
    pub base_backoff_ms: u64,
    /// Growth factor per attempt for exponential waits
    #[validate(range(min = 1.0_f64))]
    pub backoff_multiplier: f64,
    /// Upper bound on any exponential wait
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fixed_delay_ms: 200,
            base_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 8000,
        }
    }
}

impl RetryPolicy {
    /// Validates the policy. Called once at load time; a policy that passes
    /// here can be handed to the engine without further checks.
    pub fn check(&self) -> Result<(), ConfigError> {
        if !self.backoff_multiplier.is_finite() {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier",
                "must be a finite number",
            ));
        }
        self.validate().map_err(|e| validation_to_config("retry", &e))?;
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.base_backoff_ms",
                format!(
                    "base_backoff_ms ({}) exceeds max_backoff_ms ({})",
                    self.base_backoff_ms, self.max_backoff_ms
                ),
            ));
        }
        Ok(())
    }
}

/// Flattens validator output into a single `ConfigError`, naming the first
/// offending field under `section`.
pub(crate) fn validation_to_config(section: &str, e: &ValidationErrors) -> ConfigError {
    let field = e
        .field_errors()
        .keys()
        .next()
        .map(|k| format!("{section}.{k}"))
        .unwrap_or_else(|| section.to_string());
    ConfigError::invalid(field, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(RetryPolicy::default().check().is_ok());
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let policy = RetryPolicy { max_attempts: 0, ..Default::default() };
        let err = policy.check().expect_err("zero attempts");
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "retry.max_attempts"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_multiplier_below_one_rejected() {
        let policy = RetryPolicy { backoff_multiplier: 0.5, ..Default::default() };
        assert!(policy.check().is_err());
    }

    #[test]
    fn test_non_finite_multiplier_rejected() {
        for m in [f64::NAN, f64::INFINITY] {
            let policy = RetryPolicy { backoff_multiplier: m, ..Default::default() };
            assert!(policy.check().is_err(), "multiplier {m} accepted");
        }
    }

    #[test]
    fn test_base_above_cap_rejected() {
        let policy = RetryPolicy { base_backoff_ms: 9000, max_backoff_ms: 8000, ..Default::default() };
        assert!(policy.check().is_err());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let json = r#"{"max_attempts":3,"jitter":true}"#;
        assert!(serde_json::from_str::<RetryPolicy>(json).is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts":5}"#).expect("parse");
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.fixed_delay_ms, 200);
        assert_eq!(policy.max_backoff_ms, 8000);
    }
}
