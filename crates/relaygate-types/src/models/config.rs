//! Relay configuration: retry policy, classifier, upstream and credentials.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

use super::classifier::ClassifierConfig;
use super::policy::{validation_to_config, RetryPolicy};
use crate::error::ConfigError;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RelayConfig {
    /// Retry/backoff policy
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Signature-failure matching rules
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Upstream endpoint used by `probe`
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Credential pool
    #[serde(default)]
    pub pool: PoolConfig,
}

impl RelayConfig {
    /// Validates every section. The first failure wins.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.retry.check()?;
        self.classifier.check()?;
        self.upstream.validate().map_err(|e| validation_to_config("upstream", &e))?;
        self.pool.check()
    }
}

/// Upstream messages endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `http://127.0.0.1:8045`
    #[validate(url)]
    pub base_url: String,
    /// Per-attempt request timeout in seconds
    #[validate(range(min = 1_u64, max = 3600_u64))]
    pub request_timeout_secs: u64,
    /// Value sent as the `anthropic-version` header
    pub api_version: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8045".to_string(),
            request_timeout_secs: default_request_timeout(),
            api_version: default_api_version(),
        }
    }
}

pub const fn default_request_timeout() -> u64 {
    120
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Credential pool settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PoolConfig {
    /// Concurrent leases allowed per credential (0 = unlimited)
    #[serde(default)]
    pub max_in_flight_per_credential: u32,
    #[serde(default)]
    pub credentials: Vec<CredentialSpec>,
}

impl PoolConfig {
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.credentials {
            if spec.id.trim().is_empty() {
                return Err(ConfigError::invalid("pool.credentials.id", "id must not be blank"));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::invalid(
                    "pool.credentials.id",
                    format!("duplicate credential id '{}'", spec.id),
                ));
            }
        }
        Ok(())
    }
}

/// One configured account/key.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialSpec {
    pub id: String,
    pub secret: String,
}

impl CredentialSpec {
    /// Secret with everything but the last four characters hidden.
    pub fn masked_secret(&self) -> String {
        let chars: Vec<char> = self.secret.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("id", &self.id)
            .field("secret", &self.masked_secret())
            .finish()
    }
}
