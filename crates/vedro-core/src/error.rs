//! Provider and schema error types.
//!
//! Defined in `vedro-core` so the retry policy can downcast and classify
//! provider failures without string matching.

use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response, with the server's
    /// `retry-after` hint when it sent one.
    #[error("rate limited{}", retry_hint(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    /// Authentication failed (invalid or missing API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned a 5xx response.
    #[error("server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The API returned a non-retryable error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The model answered with no usable text.
    #[error("the model returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Map an HTTP status and body text to the matching variant.
    ///
    /// Returns `None` for success statuses.
    pub fn from_status(status: u16, message: String) -> Option<Self> {
        match status {
            200..=399 => None,
            401 | 403 => Some(ProviderError::AuthenticationFailed(message)),
            404 => Some(ProviderError::ModelNotFound(message)),
            429 => Some(ProviderError::RateLimited {
                retry_after_ms: None,
            }),
            500..=599 => Some(ProviderError::ServerError { status, message }),
            _ => Some(ProviderError::ApiError { status, message }),
        }
    }

    /// Returns `true` for transient failures: 429, 5xx, timeouts, and
    /// connection problems.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::ServerError { .. }
                | ProviderError::Timeout(_)
                | ProviderError::NetworkError(_)
        )
    }

    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

fn retry_hint(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {ms}ms"),
        None => String::new(),
    }
}

/// Retry decision for an arbitrary error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt, optionally after a server-provided delay.
    Transient { retry_after_ms: Option<u64> },
    /// Give up immediately.
    Fatal,
}

/// Classify an error for retry purposes.
///
/// Anything that is not a [`ProviderError`] (somewhere in the chain) is fatal.
pub fn classify(err: &anyhow::Error) -> ErrorClass {
    match err.chain().find_map(|e| e.downcast_ref::<ProviderError>()) {
        Some(pe) if pe.is_retryable() => ErrorClass::Transient {
            retry_after_ms: pe.retry_after_ms(),
        },
        _ => ErrorClass::Fatal,
    }
}

/// A single rule broken by a structured completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path of the offending field, e.g. `quizQuestions[1].options`.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A structured completion that could not be used.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The completion was not valid JSON for the target shape.
    #[error("could not parse structured response: {0}")]
    Parse(String),

    /// The completion parsed but broke one or more schema rules.
    #[error("structured response failed validation: {}", join_violations(.0))]
    Invalid(Vec<SchemaViolation>),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(ProviderError::from_status(200, String::new()).is_none());
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            Some(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            ProviderError::from_status(503, "overloaded".into()),
            Some(ProviderError::ServerError { status: 503, .. })
        ));
        assert!(matches!(
            ProviderError::from_status(403, String::new()),
            Some(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            ProviderError::from_status(400, String::new()),
            Some(ProviderError::ApiError { status: 400, .. })
        ));
    }

    #[test]
    fn retryable_classes() {
        assert!(ProviderError::RateLimited { retry_after_ms: None }.is_retryable());
        assert!(ProviderError::ServerError {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(ProviderError::Timeout(30).is_retryable());
        assert!(!ProviderError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::AuthenticationFailed(String::new()).is_retryable());
        assert!(ProviderError::ModelNotFound("x".into()).is_permanent());
    }

    #[test]
    fn rate_limit_hint_is_optional() {
        let hinted = ProviderError::RateLimited {
            retry_after_ms: Some(7000),
        };
        assert_eq!(hinted.to_string(), "rate limited, retry after 7000ms");
        assert_eq!(hinted.retry_after_ms(), Some(7000));

        let bare = ProviderError::from_status(429, String::new()).unwrap();
        assert_eq!(bare.to_string(), "rate limited");
        assert_eq!(bare.retry_after_ms(), None);
    }

    #[test]
    fn classify_downcasts_through_context() {
        let err = anyhow::Error::new(ProviderError::RateLimited {
            retry_after_ms: Some(2000),
        })
        .context("generating learning pack");
        assert_eq!(
            classify(&err),
            ErrorClass::Transient {
                retry_after_ms: Some(2000)
            }
        );

        let other = anyhow::anyhow!("rate limited, retry after 10ms");
        assert_eq!(classify(&other), ErrorClass::Fatal);
    }

    #[test]
    fn invalid_lists_every_violation() {
        let err = SchemaError::Invalid(vec![
            SchemaViolation {
                field: "simpleSummary".into(),
                message: "must not be empty".into(),
            },
            SchemaViolation {
                field: "quizQuestions".into(),
                message: "expected 3-5 items, got 1".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("simpleSummary: must not be empty"));
        assert!(msg.contains("quizQuestions: expected 3-5 items, got 1"));
    }
}
