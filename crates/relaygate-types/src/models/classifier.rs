//! Classifier configuration: how a 400 is recognised as a signature failure.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_SIGNATURE_PATTERNS: &[&str] = &[
    "Invalid `signature`",
    "Invalid signature",
    "thinking.signature",
    "thinking.thinking",
    "Corrupted thought signature",
    "failed to deserialise",
    "must be `thinking`",
    "must be 'thinking'",
];

/// Matching rules for signature/verification failures.
///
/// A 400 is a signature failure when its body contains any of
/// `signature_patterns`, or when the JSON `error.type` / `error.code`
/// equals one of `signature_error_codes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierConfig {
    #[serde(default = "default_signature_patterns")]
    pub signature_patterns: Vec<String>,
    #[serde(default)]
    pub signature_error_codes: Vec<String>,
}

fn default_signature_patterns() -> Vec<String> {
    DEFAULT_SIGNATURE_PATTERNS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { signature_patterns: default_signature_patterns(), signature_error_codes: Vec::new() }
    }
}

impl ClassifierConfig {
    /// Rejects blank entries: an empty substring would match every body.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.signature_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "classifier.signature_patterns",
                "patterns must not be blank",
            ));
        }
        if self.signature_error_codes.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "classifier.signature_error_codes",
                "error codes must not be blank",
            ));
        }
        Ok(())
    }
}
