//! HTTP plumbing shared by the hosted providers.

use std::time::Duration;

use vedro_core::error::ProviderError;

pub(crate) fn build_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))
}

pub(crate) fn send_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(err.to_string())
    }
}

/// `retry-after` in milliseconds. Only the delay-seconds form is understood;
/// anything else leaves the wait to the retry policy.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

/// Turn a non-success response into a [`ProviderError`].
///
/// `extract_message` pulls a human-readable message out of the provider's
/// error body; the raw body is used when it returns `None`.
pub(crate) async fn error_from_response(
    response: reqwest::Response,
    model: &str,
    extract_message: impl Fn(&str) -> Option<String>,
) -> ProviderError {
    let status = response.status().as_u16();
    if status == 429 {
        return ProviderError::RateLimited {
            retry_after_ms: retry_after_ms(response.headers()),
        };
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or(body);
    match status {
        404 => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::from_status(status, message.clone())
            .unwrap_or(ProviderError::ApiError { status, message }),
    }
}
