//! Upstream messages client.
//!
//! Performs exactly one HTTP attempt per call and reports the result as an
//! [`AttemptResult`]; retrying is the executor's job.

mod error_extraction;

pub use error_extraction::{extract_error_info, ErrorInfo};

use relaygate_types::UpstreamConfig;
use serde_json::Value;
use std::time::Duration;

use crate::credentials::Credential;
use crate::error::AppResult;
use crate::retry::{AttemptFailure, AttemptResult};

const MESSAGES_PATH: &str = "/v1/messages";

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn messages_url(&self) -> String {
        format!("{}{}", self.base_url, MESSAGES_PATH)
    }

    /// POST one messages request with `credential`.
    pub async fn send_messages(
        &self,
        credential: &Credential,
        body: &Value,
    ) -> AttemptResult<Value> {
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", credential.secret())
            .header("anthropic-version", &self.api_version)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        if response.status().is_success() {
            return response.json::<Value>().await.map_err(|e| transport_failure(&e));
        }

        let info = extract_error_info(response).await;
        if let Some(retry_after) = info.retry_after.as_deref() {
            tracing::debug!(
                "Upstream returned {} with Retry-After: {} (credential {})",
                info.status_code,
                retry_after,
                credential.id()
            );
        }
        Err(AttemptFailure::Http { status: info.status_code, body: info.error_text })
    }
}

fn transport_failure(e: &reqwest::Error) -> AttemptFailure {
    AttemptFailure::Transport { message: e.to_string(), timed_out: e.is_timeout() }
}
