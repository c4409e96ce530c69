//! Maps an attempt's raw status code and error body to a [`Classification`].

use relaygate_types::{Classification, ClassifierConfig};
use serde_json::Value;

use super::{KNOWN_RETRYABLE_CLIENT_CODES, STATUS_OVERLOADED};

/// JSON `error.type` that upstreams attach to overload responses.
const OVERLOADED_ERROR_TYPE: &str = "overloaded_error";

/// Status classifier. Holds the configured signature-failure patterns.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    signature_patterns: Vec<String>,
    signature_error_codes: Vec<String>,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            signature_patterns: config.signature_patterns.clone(),
            signature_error_codes: config.signature_error_codes.clone(),
        }
    }

    /// Classify an HTTP response.
    ///
    /// `error_body` is `None` when the body could not be read; a 4xx without a
    /// readable body cannot be ruled out as transient and is treated as
    /// `OtherRetryable`.
    pub fn classify(&self, raw_status_code: u16, error_body: Option<&str>) -> Classification {
        match raw_status_code {
            200..=299 => Classification::Success,
            STATUS_OVERLOADED => Classification::ServerOverload,
            400..=499 => {
                let Some(body) = error_body else {
                    return Classification::OtherRetryable;
                };
                if raw_status_code == 400 && self.is_signature_error(body) {
                    Classification::ClientSignatureFailure
                } else if KNOWN_RETRYABLE_CLIENT_CODES.contains(&raw_status_code) {
                    Classification::OtherRetryable
                } else {
                    Classification::NonRetryable
                }
            },
            500..=599 if error_body.is_some_and(is_overload_body) => {
                Classification::ServerOverload
            },
            _ => Classification::OtherRetryable,
        }
    }

    /// Checks the body against the configured substrings and JSON error codes.
    pub fn is_signature_error(&self, error_body: &str) -> bool {
        if self.signature_patterns.iter().any(|p| error_body.contains(p.as_str())) {
            return true;
        }
        if self.signature_error_codes.is_empty() {
            return false;
        }
        let Ok(json) = serde_json::from_str::<Value>(error_body) else {
            return false;
        };
        error_identifiers(&json)
            .iter()
            .any(|id| self.signature_error_codes.iter().any(|code| code == id))
    }
}

/// Transport failures (connect errors, timeouts) carry no status code and are
/// always worth another attempt.
pub const fn classify_transport() -> Classification {
    Classification::OtherRetryable
}

/// `error.type`, `error.code` and `error.status` as strings.
fn error_identifiers(json: &Value) -> Vec<String> {
    let Some(error) = json.get("error") else {
        return Vec::new();
    };
    ["type", "code", "status"]
        .iter()
        .filter_map(|key| match error.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn is_overload_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("type"))
                .and_then(Value::as_str)
                .map(|t| t == OVERLOADED_ERROR_TYPE)
        })
        .unwrap_or(false)
}
