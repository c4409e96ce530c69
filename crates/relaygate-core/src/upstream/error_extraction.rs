//! Error info extraction from upstream HTTP responses.

/// Extracted error information from a non-success response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub status_code: u16,
    pub retry_after: Option<String>,
    /// `None` when the body could not be read.
    pub error_text: Option<String>,
}

/// Extracts error details from a failed upstream response.
pub async fn extract_error_info(response: reqwest::Response) -> ErrorInfo {
    let status_code = response.status().as_u16();
    let retry_after =
        response.headers().get("Retry-After").and_then(|h| h.to_str().ok()).map(|s| s.to_string());
    let error_text = match response.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!("Failed to read error body for status {}: {}", status_code, e);
            None
        },
    };
    ErrorInfo { status_code, retry_after, error_text }
}
